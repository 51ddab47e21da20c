pub mod detect;
pub mod locate;
