pub mod codec_error;
pub mod model_error;
