use chrono::{Datelike, Duration, Local};
use rand::Rng;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Genera un salt aleatorio de 16 caracteres hexadecimales
pub fn generar_salt() -> String {
    let mut rng = rand::thread_rng();
    let salt: u64 = rng.gen();
    format!("{:016x}", salt)
}

/// Hash de PIN con salt usando SHA-256
/// Retorna el hash en formato hexadecimal
pub fn hash_pin(salt: &str, pin: &str) -> String {
    let input = format!("{}{}", salt, pin);
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

/// Fecha y hora local en el mismo formato que datetime('now','localtime')
pub fn ahora() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fecha local YYYY-MM-DD
pub fn hoy() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Fecha y hora local desplazada N días, formato de la base
pub fn fecha_mas_dias(dias: i64) -> String {
    (Local::now() + Duration::days(dias))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Año en curso para los números de orden ORD-<año>-NNNNNN
pub fn anio_actual() -> i32 {
    Local::now().year()
}

/// Fecha local compacta YYYYMMDD para folios CONS- y NC-
pub fn fecha_compacta() -> String {
    Local::now().format("%Y%m%d").to_string()
}

/// Lee una columna TEXT como Decimal. Los montos se guardan como texto
/// para no perder precisión en SQLite.
pub fn leer_decimal(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let texto: String = row.get(idx)?;
    Decimal::from_str(&texto).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
