pub mod decode;
pub mod transform;

pub use decode::{AudioDecoder, DecoderFactory, PassthroughDecoder, PassthroughFactory};
pub use transform::{AudioTransformer, WavTransformer};
