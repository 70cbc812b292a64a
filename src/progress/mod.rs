pub mod model;
pub mod profile;
pub mod streak;
pub mod unlock;
