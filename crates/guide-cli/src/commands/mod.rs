pub mod ask;
pub mod chat;
pub mod identify;
pub mod model;
pub mod serve;
