pub mod crop;
pub mod decode;
pub mod encode;
pub mod filters;
pub mod frame;
pub mod mask;
