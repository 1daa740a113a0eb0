pub mod prelude;

pub mod song;
