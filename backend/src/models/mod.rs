pub mod auth;
pub mod dashboard;
pub mod kegiatan;
pub mod kesehatan;
pub mod keuangan;
pub mod pengaduan;
pub mod santri;
pub mod user;
