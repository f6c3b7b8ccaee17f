pub mod clock;
pub mod conflict;
pub mod expansion;
pub mod models;
