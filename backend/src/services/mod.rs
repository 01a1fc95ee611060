pub mod auth;
pub mod dashboard;
pub mod format;
pub mod kegiatan;
pub mod kesehatan;
pub mod keuangan;
pub mod linkage;
pub mod metrics;
pub mod pengaduan;
pub mod profile;
pub mod statistik;
pub mod upload;
