pub mod auth;
pub mod health;
pub mod metrics;
pub mod orangtua;
pub mod pengaduan;
pub mod pengurus;
