pub mod polaroid_api;
