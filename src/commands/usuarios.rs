use crate::db::{Database, SesionState};
use crate::error::AppError;
use crate::models::{NuevoUsuario, SesionActiva, UsuarioInfo};
use crate::utils;

/// Verifica el PIN contra todos los usuarios activos.
/// Si coincide, establece la sesión activa.
pub fn iniciar_sesion(
    db: &Database,
    sesion: &SesionState,
    pin: &str,
) -> Result<SesionActiva, AppError> {
    let conn = db.conexion()?;

    let mut stmt =
        conn.prepare("SELECT id, nombre, pin_hash, pin_salt, rol FROM usuarios WHERE activo = 1")?;

    let usuarios: Vec<(i64, String, String, String, String)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (id, nombre, pin_hash, pin_salt, rol) in usuarios {
        let hash_intento = utils::hash_pin(&pin_salt, pin);
        if hash_intento == pin_hash {
            let nueva_sesion = SesionActiva {
                usuario_id: id,
                nombre,
                rol,
            };
            let mut sesion_guard = bloquear_sesion(sesion)?;
            *sesion_guard = Some(nueva_sesion.clone());
            tracing::info!(usuario = %nueva_sesion.nombre, "sesión iniciada");
            return Ok(nueva_sesion);
        }
    }

    Err(AppError::validacion("PIN incorrecto"))
}

/// Cierra la sesión activa
pub fn cerrar_sesion(sesion: &SesionState) -> Result<(), AppError> {
    let mut sesion_guard = bloquear_sesion(sesion)?;
    *sesion_guard = None;
    Ok(())
}

/// Retorna la sesión activa (o None si no hay)
pub fn obtener_sesion_actual(sesion: &SesionState) -> Result<Option<SesionActiva>, AppError> {
    let sesion_guard = bloquear_sesion(sesion)?;
    Ok(sesion_guard.clone())
}

/// Crea un nuevo usuario. Requiere sesión ADMIN.
pub fn crear_usuario(
    db: &Database,
    sesion: &SesionState,
    usuario: NuevoUsuario,
) -> Result<UsuarioInfo, AppError> {
    verificar_admin(sesion)?;

    // Validar PIN: solo 4-6 dígitos
    if !usuario.pin.chars().all(|c| c.is_ascii_digit())
        || usuario.pin.len() < 4
        || usuario.pin.len() > 6
    {
        return Err(AppError::validacion(
            "El PIN debe tener 4 a 6 dígitos numéricos",
        ));
    }

    if usuario.rol != "ADMIN" && usuario.rol != "VENDEDOR" {
        return Err(AppError::validacion("El rol debe ser ADMIN o VENDEDOR"));
    }

    let nombre = usuario.nombre.trim().to_uppercase();
    if nombre.is_empty() {
        return Err(AppError::validacion("El nombre no puede estar vacío"));
    }

    let conn = db.conexion()?;

    let existe: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM usuarios WHERE nombre = ?1",
            rusqlite::params![nombre],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
        .unwrap_or(false);

    if existe {
        return Err(AppError::validacion(format!(
            "Ya existe un usuario con el nombre '{}'",
            nombre
        )));
    }

    let salt = utils::generar_salt();
    let pin_hash = utils::hash_pin(&salt, &usuario.pin);

    conn.execute(
        "INSERT INTO usuarios (nombre, pin_hash, pin_salt, rol, activo)
         VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params![nombre, pin_hash, salt, usuario.rol],
    )?;

    Ok(UsuarioInfo {
        id: conn.last_insert_rowid(),
        nombre,
        rol: usuario.rol,
        activo: true,
    })
}

pub fn listar_usuarios(db: &Database) -> Result<Vec<UsuarioInfo>, AppError> {
    let conn = db.conexion()?;

    let mut stmt = conn.prepare("SELECT id, nombre, rol, activo FROM usuarios ORDER BY nombre")?;
    let usuarios = stmt
        .query_map([], |row| {
            Ok(UsuarioInfo {
                id: row.get(0)?,
                nombre: row.get(1)?,
                rol: row.get(2)?,
                activo: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(usuarios)
}

fn bloquear_sesion(
    sesion: &SesionState,
) -> Result<std::sync::MutexGuard<'_, Option<SesionActiva>>, AppError> {
    sesion
        .sesion
        .lock()
        .map_err(|_| AppError::Concurrencia("el estado de sesión quedó envenenado".to_string()))
}

/// Sesión requerida por las operaciones de mostrador
pub(crate) fn requerir_sesion(sesion: &SesionState) -> Result<SesionActiva, AppError> {
    let guard = bloquear_sesion(sesion)?;
    guard
        .clone()
        .ok_or_else(|| AppError::validacion("Debe iniciar sesión"))
}

/// Operaciones reservadas al administrador
pub(crate) fn verificar_admin(sesion: &SesionState) -> Result<SesionActiva, AppError> {
    let actual = requerir_sesion(sesion)?;
    if actual.rol != "ADMIN" {
        return Err(AppError::validacion("Se requiere rol ADMIN"));
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iniciar_sesion_admin_por_defecto() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();

        let activa = iniciar_sesion(&db, &sesion, "0000").unwrap();
        assert_eq!(activa.nombre, "ADMINISTRADOR");
        assert_eq!(activa.rol, "ADMIN");
        assert!(obtener_sesion_actual(&sesion).unwrap().is_some());
    }

    #[test]
    fn test_pin_incorrecto() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();

        let err = iniciar_sesion(&db, &sesion, "9999");
        assert!(matches!(err, Err(AppError::Validacion(_))));
        assert!(obtener_sesion_actual(&sesion).unwrap().is_none());
    }

    #[test]
    fn test_crear_usuario_requiere_admin() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();

        let nuevo = NuevoUsuario {
            nombre: "laura".to_string(),
            pin: "1234".to_string(),
            rol: "VENDEDOR".to_string(),
        };
        assert!(crear_usuario(&db, &sesion, nuevo).is_err());

        iniciar_sesion(&db, &sesion, "0000").unwrap();
        let creado = crear_usuario(
            &db,
            &sesion,
            NuevoUsuario {
                nombre: "laura".to_string(),
                pin: "1234".to_string(),
                rol: "VENDEDOR".to_string(),
            },
        )
        .unwrap();
        assert_eq!(creado.nombre, "LAURA");

        // Nombre duplicado
        let dup = crear_usuario(
            &db,
            &sesion,
            NuevoUsuario {
                nombre: "Laura".to_string(),
                pin: "5678".to_string(),
                rol: "VENDEDOR".to_string(),
            },
        );
        assert!(matches!(dup, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_pin_invalido() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();
        iniciar_sesion(&db, &sesion, "0000").unwrap();

        let err = crear_usuario(
            &db,
            &sesion,
            NuevoUsuario {
                nombre: "PEPE".to_string(),
                pin: "12ab".to_string(),
                rol: "VENDEDOR".to_string(),
            },
        );
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_cerrar_sesion() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();
        iniciar_sesion(&db, &sesion, "0000").unwrap();
        cerrar_sesion(&sesion).unwrap();
        assert!(requerir_sesion(&sesion).is_err());
    }
}
