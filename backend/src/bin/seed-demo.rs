//! Demo pesantren seed script
//!
//! Seeds a small, realistic pesantren:
//! - 1 pengurus, 1 pengajar, 1 tim kesehatan
//! - 4 santri in 2 rooms (Putra/Putri) and 2 classes
//! - 2 orangtua, each linked to one santri
//! - bills with payments over the last months, activities with attendance,
//!   complaints with replies, health records and service requests
//!
//! Every demo account has an id-number starting with `DEMO-`.
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo --password Demo2026! --reset

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Parser;
use sqlx::{postgres::PgPoolOptions, PgConnection};
use uuid::Uuid;

const DEMO_PREFIX: &str = "DEMO-";

#[derive(Parser)]
#[command(name = "seed-demo", about = "Populate a demo pesantren")]
struct Args {
    /// Password for every demo account
    #[arg(long, default_value = "Demo2026!")]
    password: String,

    /// Remove previously seeded demo data first
    #[arg(long)]
    reset: bool,
}

async fn insert_user(
    conn: &mut PgConnection,
    nama: &str,
    suffix: &str,
    jenis_kelamin: &str,
    role: &str,
    password_hash: &str,
) -> Result<Uuid> {
    let no_identitas = format!("{DEMO_PREFIX}{suffix}");
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (nama, no_identitas, email, password_hash, jenis_kelamin)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(nama)
    .bind(&no_identitas)
    .bind(format!("{}@demo.pesantren.id", suffix.to_lowercase()))
    .bind(password_hash)
    .bind(jenis_kelamin)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert user {no_identitas}"))?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE nama = $2")
        .bind(id)
        .bind(role)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to assign role {role}"))?;
    Ok(id)
}

/// Deletes demo rows in dependency order.
async fn reset(conn: &mut PgConnection) -> Result<()> {
    let demo_users = "SELECT id FROM users WHERE no_identitas LIKE 'DEMO-%'";
    let statements = [
        format!("DELETE FROM tanggapan_pengaduan WHERE user_id IN ({demo_users})"),
        format!("DELETE FROM pengaduan WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM pembayaran WHERE tagihan_id IN (SELECT id FROM tagihan WHERE santri_id IN ({demo_users}))"),
        format!("DELETE FROM tagihan WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM kehadiran WHERE santri_id IN ({demo_users})"),
        "DELETE FROM kegiatan WHERE deskripsi = 'demo'".to_string(),
        format!("DELETE FROM kesehatan_santri WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM screening_scabies WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM layanan WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM kamar_santri WHERE santri_id IN ({demo_users})"),
        format!("DELETE FROM kelas_santri WHERE santri_id IN ({demo_users})"),
        "DELETE FROM kamar WHERE nama_kamar LIKE 'Demo %'".to_string(),
        "DELETE FROM kelas WHERE nama_kelas LIKE 'Demo %'".to_string(),
        format!("DELETE FROM orangtua_santri WHERE orangtua_id IN ({demo_users}) OR santri_id IN ({demo_users})"),
        "DELETE FROM users WHERE no_identitas LIKE 'DEMO-%'".to_string(),
    ];
    for sql in &statements {
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Reset failed: {sql}"))?;
    }
    Ok(())
}

fn time(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    pesantren_api::db::run_migrations(&pool).await?;

    let mut tx = pool.begin().await?;

    if args.reset {
        tracing::info!("Removing existing demo data...");
        reset(&mut *tx).await?;
    }

    // Cost 10 for seed speed
    let hash = bcrypt::hash(&args.password, 10).context("Failed to hash demo password")?;

    tracing::info!("Inserting users...");
    insert_user(&mut *tx, "Ustadz Rahmat Hidayat", "PGR-001", "L", "Pengurus", &hash).await?;
    let pengajar = insert_user(&mut *tx, "Ustadzah Nur Aini", "PGJ-001", "P", "Pengajar", &hash).await?;
    let perawat = insert_user(&mut *tx, "Dewi Lestari", "KES-001", "P", "Tim Kesehatan", &hash).await?;

    let santri = [
        ("Ahmad Fauzi", "S-001", "L"),
        ("Muhammad Rizki", "S-002", "L"),
        ("Aisyah Putri", "S-003", "P"),
        ("Fatimah Zahra", "S-004", "P"),
    ];
    let mut santri_ids = Vec::with_capacity(santri.len());
    for (nama, suffix, jk) in santri {
        santri_ids.push(insert_user(&mut *tx, nama, suffix, jk, "Santri", &hash).await?);
    }

    let ayah = insert_user(&mut *tx, "Budi Santoso", "OT-001", "L", "Orangtua", &hash).await?;
    let ibu = insert_user(&mut *tx, "Siti Maryam", "OT-002", "P", "Orangtua", &hash).await?;
    for (orangtua, santri_id, hubungan) in [(ayah, santri_ids[0], "Ayah"), (ibu, santri_ids[2], "Ibu")] {
        sqlx::query("INSERT INTO orangtua_santri (orangtua_id, santri_id, hubungan) VALUES ($1, $2, $3)")
            .bind(orangtua)
            .bind(santri_id)
            .bind(hubungan)
            .execute(&mut *tx)
            .await?;
    }

    tracing::info!("Inserting rooms and classes...");
    let today = Local::now().date_naive();
    let entry = today - Duration::days(120);

    let kamar_putra: Uuid = sqlx::query_scalar(
        "INSERT INTO kamar (nama_kamar, jenis_kamar, kapasitas) VALUES ('Demo Al-Fatih', 'Putra', 8) RETURNING id",
    )
    .fetch_one(&mut *tx)
    .await?;
    let kamar_putri: Uuid = sqlx::query_scalar(
        "INSERT INTO kamar (nama_kamar, jenis_kamar, kapasitas) VALUES ('Demo Khadijah', 'Putri', 6) RETURNING id",
    )
    .fetch_one(&mut *tx)
    .await?;
    let kelas_1: Uuid = sqlx::query_scalar(
        "INSERT INTO kelas (nama_kelas, tingkat) VALUES ('Demo 7A', 'Tsanawiyah') RETURNING id",
    )
    .fetch_one(&mut *tx)
    .await?;
    let kelas_2: Uuid = sqlx::query_scalar(
        "INSERT INTO kelas (nama_kelas, tingkat) VALUES ('Demo 7B', 'Tsanawiyah') RETURNING id",
    )
    .fetch_one(&mut *tx)
    .await?;

    for (i, santri_id) in santri_ids.iter().enumerate() {
        let kamar = if i < 2 { kamar_putra } else { kamar_putri };
        let kelas = if i % 2 == 0 { kelas_1 } else { kelas_2 };
        sqlx::query("INSERT INTO kamar_santri (kamar_id, santri_id, tanggal_masuk) VALUES ($1, $2, $3)")
            .bind(kamar)
            .bind(santri_id)
            .bind(entry)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO kelas_santri (kelas_id, santri_id, tanggal_masuk) VALUES ($1, $2, $3)")
            .bind(kelas)
            .bind(santri_id)
            .bind(entry)
            .execute(&mut *tx)
            .await?;
    }

    tracing::info!("Inserting bills and payments...");
    // Five paid months, then the current month left open.
    for santri_id in &santri_ids {
        for back in (0..6i64).rev() {
            let jatuh_tempo = today - Duration::days(30 * back);
            let lunas = back > 0;
            let tagihan_id: Uuid = sqlx::query_scalar(
                "INSERT INTO tagihan (santri_id, nama_tagihan, nominal, jatuh_tempo, status)
                 VALUES ($1, $2, 750000, $3, $4)
                 RETURNING id",
            )
            .bind(santri_id)
            .bind(format!("SPP {}", jatuh_tempo.format("%m/%Y")))
            .bind(jatuh_tempo)
            .bind(if lunas { "Lunas" } else { "Aktif" })
            .fetch_one(&mut *tx)
            .await?;

            if lunas {
                sqlx::query(
                    "INSERT INTO pembayaran (tagihan_id, nominal, tanggal_bayar, status)
                     VALUES ($1, 750000, $2, 'Berhasil')",
                )
                .bind(tagihan_id)
                .bind(jatuh_tempo - Duration::days(3))
                .execute(&mut *tx)
                .await?;
            }
        }
    }
    // One transfer awaiting verification.
    sqlx::query(
        "INSERT INTO pembayaran (tagihan_id, nominal, tanggal_bayar, status)
         SELECT id, nominal, $2, 'Pending' FROM tagihan
         WHERE santri_id = $1 AND status = 'Aktif'",
    )
    .bind(santri_ids[2])
    .bind(today)
    .execute(&mut *tx)
    .await?;

    tracing::info!("Inserting activities...");
    let kegiatan: [(&str, &str, NaiveDate, Option<NaiveTime>, Option<NaiveTime>, &str); 4] = [
        ("Kajian Kitab Kuning", "Pengajian", today, time(5, 0), time(6, 30), "Masjid"),
        ("Tahfidz Juz 30", "Tahfidz", today, time(16, 0), time(17, 0), "Aula"),
        ("Lomba Kaligrafi", "Lomba", today + Duration::days(7), time(8, 0), time(12, 0), "Aula"),
        ("Kerja Bakti", "Kebersihan", today - Duration::days(5), time(7, 0), time(9, 0), "Halaman"),
    ];
    for (nama, jenis, tanggal, mulai, selesai, lokasi) in kegiatan {
        let kegiatan_id: Uuid = sqlx::query_scalar(
            "INSERT INTO kegiatan (nama_kegiatan, jenis, tanggal, waktu_mulai, waktu_selesai, lokasi, deskripsi)
             VALUES ($1, $2, $3, $4, $5, $6, 'demo')
             RETURNING id",
        )
        .bind(nama)
        .bind(jenis)
        .bind(tanggal)
        .bind(mulai)
        .bind(selesai)
        .bind(lokasi)
        .fetch_one(&mut *tx)
        .await?;

        let status = if tanggal < today { Some("Hadir") } else { None };
        for santri_id in &santri_ids {
            sqlx::query("INSERT INTO kehadiran (kegiatan_id, santri_id, status) VALUES ($1, $2, $3)")
                .bind(kegiatan_id)
                .bind(santri_id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }
    }

    tracing::info!("Inserting complaints...");
    let pengaduan_id: Uuid = sqlx::query_scalar(
        "INSERT INTO pengaduan (santri_id, pelapor_id, judul, isi, status)
         VALUES ($1, $2, 'Kamar bocor', 'Atap kamar Al-Fatih bocor saat hujan.', 'Diproses')
         RETURNING id",
    )
    .bind(santri_ids[0])
    .bind(ayah)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO tanggapan_pengaduan (pengaduan_id, user_id, isi) VALUES ($1, $2, $3)")
        .bind(pengaduan_id)
        .bind(pengajar)
        .bind("Sudah dilaporkan ke bagian sarana, perbaikan minggu ini.")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO pengaduan (santri_id, pelapor_id, judul, isi)
         VALUES ($1, $2, 'Jadwal kunjungan', 'Mohon info jadwal kunjungan bulan depan.')",
    )
    .bind(santri_ids[2])
    .bind(ibu)
    .execute(&mut *tx)
    .await?;

    tracing::info!("Inserting health records and service requests...");
    let kesehatan_id: Uuid = sqlx::query_scalar(
        "INSERT INTO kesehatan_santri (santri_id, pemeriksa_id, tanggal, keluhan, diagnosa, status)
         VALUES ($1, $2, $3, 'Demam dan pusing', 'Flu ringan', 'Sembuh')
         RETURNING id",
    )
    .bind(santri_ids[0])
    .bind(perawat)
    .bind(today - Duration::days(10))
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO catatan_kesehatan (kesehatan_id, catatan) VALUES ($1, 'Istirahat 2 hari, minum obat teratur.')")
        .bind(kesehatan_id)
        .execute(&mut *tx)
        .await?;
    for (santri_id, hasil) in [(santri_ids[0], "Negatif"), (santri_ids[2], "Suspek")] {
        sqlx::query("INSERT INTO screening_scabies (santri_id, tanggal, hasil) VALUES ($1, $2, $3)")
            .bind(santri_id)
            .bind(today - Duration::days(14))
            .bind(hasil)
            .execute(&mut *tx)
            .await?;
    }
    for (santri_id, jenis, status) in [
        (santri_ids[1], "Surat izin pulang", Some("Pending")),
        (santri_ids[3], "Legalisir rapor", None),
        (santri_ids[2], "Surat keterangan aktif", Some("Selesai")),
    ] {
        sqlx::query("INSERT INTO layanan (santri_id, jenis_layanan, status) VALUES ($1, $2, $3)")
            .bind(santri_id)
            .bind(jenis)
            .bind(status)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Demo pesantren seeded. Log in with DEMO-OT-001 / DEMO-PGR-001 and the given password.");
    Ok(())
}
