pub use super::song::Entity as Song;
