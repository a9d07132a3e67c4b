use crate::db::Database;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;

pub fn obtener_config(db: &Database) -> Result<HashMap<String, String>, AppError> {
    let conn = db.conexion()?;

    let mut stmt = conn.prepare("SELECT key, value FROM config")?;

    let config = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(config)
}

pub fn guardar_config(db: &Database, configs: HashMap<String, String>) -> Result<(), AppError> {
    let conn = db.conexion()?;

    for (key, value) in configs {
        conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
    }

    Ok(())
}

/// Guarda el logo del negocio como base64 en config
pub fn cargar_logo_negocio(db: &Database, logo_path: &str) -> Result<(), AppError> {
    let bytes = std::fs::read(logo_path)
        .map_err(|e| AppError::validacion(format!("Error leyendo imagen: {}", e)))?;

    // Validar tamaño máximo (500KB)
    if bytes.len() > 500_000 {
        return Err(AppError::validacion(
            "La imagen es demasiado grande. Máximo 500KB.",
        ));
    }

    let b64 = BASE64.encode(&bytes);

    let conn = db.conexion()?;
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES ('logo_negocio', ?1)",
        rusqlite::params![b64],
    )?;

    Ok(())
}

pub fn eliminar_logo_negocio(db: &Database) -> Result<(), AppError> {
    let conn = db.conexion()?;
    conn.execute("DELETE FROM config WHERE key = 'logo_negocio'", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_por_defecto() {
        let db = Database::abrir_en_memoria().unwrap();
        let config = obtener_config(&db).unwrap();
        assert_eq!(config.get("nombre_negocio").map(String::as_str), Some("Pronto Shoes"));
        assert_eq!(
            config.get("dias_vigencia_nota_credito").map(String::as_str),
            Some("60")
        );
    }

    #[test]
    fn test_guardar_y_leer() {
        let db = Database::abrir_en_memoria().unwrap();
        let mut cambios = HashMap::new();
        cambios.insert("telefono".to_string(), "555-0134".to_string());
        cambios.insert("sucursal".to_string(), "CENTRO".to_string());
        guardar_config(&db, cambios).unwrap();

        let config = obtener_config(&db).unwrap();
        assert_eq!(config.get("telefono").map(String::as_str), Some("555-0134"));
        assert_eq!(config.get("sucursal").map(String::as_str), Some("CENTRO"));
    }

    #[test]
    fn test_logo_ida_y_vuelta() {
        let db = Database::abrir_en_memoria().unwrap();
        let ruta = std::env::temp_dir().join("pronto-pos-logo-test.png");
        std::fs::write(&ruta, b"imagen de prueba").unwrap();

        cargar_logo_negocio(&db, ruta.to_str().unwrap()).unwrap();
        let config = obtener_config(&db).unwrap();
        assert!(config.contains_key("logo_negocio"));

        eliminar_logo_negocio(&db).unwrap();
        assert!(!obtener_config(&db).unwrap().contains_key("logo_negocio"));

        std::fs::remove_file(&ruta).ok();
    }

    #[test]
    fn test_logo_inexistente() {
        let db = Database::abrir_en_memoria().unwrap();
        let err = cargar_logo_negocio(&db, "/ruta/que/no/existe.png");
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }
}
