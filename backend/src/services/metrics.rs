use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Percobaan login per status",
        &["status"]
    ).unwrap();

    pub static ref REGISTRATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_registrations_total",
        "Registrasi akun per role",
        &["role"]
    ).unwrap();

    pub static ref PAYMENT_UPLOADS_COUNTER: CounterVec = register_counter_vec!(
        "api_payment_uploads_total",
        "Upload bukti bayar per status",
        &["status"]
    ).unwrap();

    pub static ref PENGADUAN_COUNTER: CounterVec = register_counter_vec!(
        "api_pengaduan_events_total",
        "Pengaduan dan tanggapan yang dibuat",
        &["kind"]
    ).unwrap();
}
