pub mod schema;

use crate::error::AppError;
use crate::models::SesionActiva;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

pub struct Database {
    pub conn: Mutex<Connection>,
}

pub struct SesionState {
    pub sesion: Mutex<Option<SesionActiva>>,
}

impl SesionState {
    pub fn nueva() -> Self {
        SesionState {
            sesion: Mutex::new(None),
        }
    }
}

impl Database {
    pub fn new() -> Result<Self, AppError> {
        let db_path = Self::get_db_path();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(&db_path)?;
        Self::inicializar(conn)
    }

    /// Base en memoria, usada por las pruebas
    pub fn abrir_en_memoria() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        Self::inicializar(conn)
    }

    fn inicializar(conn: Connection) -> Result<Self, AppError> {
        // Optimizaciones SQLite para POS
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -8000;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        let db = Database {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Toma la conexión. Un mutex envenenado se reporta como conflicto
    /// reintentable en lugar de tirar el proceso.
    pub fn conexion(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Concurrencia("la conexión quedó envenenada".to_string()))
    }

    fn get_db_path() -> PathBuf {
        let mut path = dir_datos().unwrap_or_else(|| PathBuf::from("."));
        path.push("pronto-pos.db");
        path
    }

    fn run_migrations(&self) -> Result<(), AppError> {
        let conn = self.conexion()?;
        schema::create_tables(&conn)?;

        // Seed admin por defecto si no hay usuarios
        seed_default_admin(&conn);

        Ok(())
    }
}

/// Inserta el usuario ADMINISTRADOR con PIN 0000 si no hay usuarios
fn seed_default_admin(conn: &Connection) {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM usuarios", [], |row| row.get(0))
        .unwrap_or(0);

    if count == 0 {
        let salt = crate::utils::generar_salt();
        let pin_hash = crate::utils::hash_pin(&salt, "0000");
        conn.execute(
            "INSERT INTO usuarios (nombre, pin_hash, pin_salt, rol, activo)
             VALUES ('ADMINISTRADOR', ?1, ?2, 'ADMIN', 1)",
            rusqlite::params![pin_hash, salt],
        )
        .ok();
    }
}

/// Retorna el directorio de datos de la aplicación
fn dir_datos() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("LOCALAPPDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("ProntoPOS"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .ok()
            .map(|p| PathBuf::from(p).join(".pronto-pos"))
    }
}

/// Toma el siguiente valor de un contador con nombre. Debe llamarse dentro
/// de la transacción que usa el folio para que la reserva sea atómica.
pub fn siguiente_secuencial(conn: &Connection, clave: &str) -> Result<i64, AppError> {
    conn.execute(
        "INSERT OR IGNORE INTO secuenciales (clave, valor) VALUES (?1, 0)",
        rusqlite::params![clave],
    )?;
    conn.execute(
        "UPDATE secuenciales SET valor = valor + 1 WHERE clave = ?1",
        rusqlite::params![clave],
    )?;
    let valor: i64 = conn.query_row(
        "SELECT valor FROM secuenciales WHERE clave = ?1",
        rusqlite::params![clave],
        |row| row.get(0),
    )?;
    Ok(valor)
}

/// Lee un valor de config como entero, con default si falta o no parsea
pub fn config_entero(conn: &Connection, key: &str, default: i64) -> i64 {
    conn.query_row(
        "SELECT value FROM config WHERE key = ?1",
        rusqlite::params![key],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(default)
}
