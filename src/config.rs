use crate::error::EnhanceError;
use crate::preprocessing::PipelineParams;
use crate::Args;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub page_timeout_secs: Option<u64>,
    pub params: PipelineParams,
}

impl TryFrom<Args> for Config {
    type Error = EnhanceError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let params = PipelineParams {
            max_long_edge: args.max_long_edge,
            gamma: args.gamma,
            window_divisor: args.window_divisor,
            min_window: args.min_window,
            threshold_bias: args.threshold_bias,
            skew_max_degrees: args.skew_max_degrees,
            skew_include_zero: args.skew_include_zero,
            skew_sample_stride: args.skew_sample_stride,
            jpeg_quality: args.jpeg_quality,
        };
        params.validate()?;

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            page_timeout_secs: args.page_timeout_secs,
            params,
        })
    }
}
