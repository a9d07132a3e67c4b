use crate::db::Database;
use crate::error::AppError;
use crate::models::{Catalogo, Producto, ProductoBusqueda};
use crate::utils;

pub fn crear_producto(db: &Database, producto: Producto) -> Result<i64, AppError> {
    if producto.codigo.trim().is_empty() {
        return Err(AppError::validacion("El código del producto es obligatorio"));
    }

    let conn = db.conexion()?;

    conn.execute(
        "INSERT INTO productos (codigo, marca, modelo, color, propiedad, costo, precio,
         temporada, oferta, admite_devolucion, stock_actual, stock_minimo,
         proveedor_id, catalogo_id, activo)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        rusqlite::params![
            producto.codigo.trim(),
            producto.marca,
            producto.modelo,
            producto.color,
            producto.propiedad,
            producto.costo.to_string(),
            producto.precio.to_string(),
            producto.temporada,
            producto.oferta as i32,
            producto.admite_devolucion as i32,
            producto.stock_actual,
            producto.stock_minimo,
            producto.proveedor_id,
            producto.catalogo_id,
            producto.activo as i32,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn actualizar_producto(db: &Database, producto: Producto) -> Result<(), AppError> {
    let conn = db.conexion()?;
    let id = producto
        .id
        .ok_or_else(|| AppError::validacion("ID requerido para actualizar"))?;

    let afectadas = conn.execute(
        "UPDATE productos SET codigo=?1, marca=?2, modelo=?3, color=?4, propiedad=?5,
         costo=?6, precio=?7, temporada=?8, oferta=?9, admite_devolucion=?10,
         stock_actual=?11, stock_minimo=?12, proveedor_id=?13, catalogo_id=?14,
         activo=?15, updated_at=datetime('now','localtime')
         WHERE id=?16",
        rusqlite::params![
            producto.codigo.trim(),
            producto.marca,
            producto.modelo,
            producto.color,
            producto.propiedad,
            producto.costo.to_string(),
            producto.precio.to_string(),
            producto.temporada,
            producto.oferta as i32,
            producto.admite_devolucion as i32,
            producto.stock_actual,
            producto.stock_minimo,
            producto.proveedor_id,
            producto.catalogo_id,
            producto.activo as i32,
            id,
        ],
    )?;

    if afectadas == 0 {
        return Err(AppError::no_encontrado(format!("Producto {} no existe", id)));
    }

    Ok(())
}

fn mapear_producto(row: &rusqlite::Row) -> rusqlite::Result<Producto> {
    Ok(Producto {
        id: Some(row.get(0)?),
        codigo: row.get(1)?,
        marca: row.get(2)?,
        modelo: row.get(3)?,
        color: row.get(4)?,
        propiedad: row.get(5)?,
        costo: utils::leer_decimal(row, 6)?,
        precio: utils::leer_decimal(row, 7)?,
        temporada: row.get(8)?,
        oferta: row.get::<_, i64>(9)? != 0,
        admite_devolucion: row.get::<_, i64>(10)? != 0,
        stock_actual: row.get(11)?,
        stock_minimo: row.get(12)?,
        proveedor_id: row.get(13)?,
        catalogo_id: row.get(14)?,
        activo: row.get::<_, i64>(15)? != 0,
    })
}

const COLUMNAS_PRODUCTO: &str = "id, codigo, marca, modelo, color, propiedad, costo, precio,
     temporada, oferta, admite_devolucion, stock_actual, stock_minimo,
     proveedor_id, catalogo_id, activo";

pub fn obtener_producto(db: &Database, id: i64) -> Result<Producto, AppError> {
    let conn = db.conexion()?;
    let sql = format!("SELECT {} FROM productos WHERE id = ?1", COLUMNAS_PRODUCTO);
    conn.query_row(&sql, rusqlite::params![id], mapear_producto)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Producto {} no existe", id))
            }
            otro => otro.into(),
        })
}

pub fn buscar_productos(db: &Database, termino: &str) -> Result<Vec<ProductoBusqueda>, AppError> {
    let conn = db.conexion()?;
    let busqueda = format!("%{}%", termino);

    let mut stmt = conn.prepare(
        "SELECT p.id, p.codigo, p.marca, p.modelo, p.color, p.precio,
                p.stock_actual, p.stock_minimo, c.nombre
         FROM productos p
         LEFT JOIN catalogos c ON p.catalogo_id = c.id
         WHERE p.activo = 1
         AND (p.codigo LIKE ?1 OR p.marca LIKE ?1 OR p.modelo LIKE ?1)
         ORDER BY p.codigo
         LIMIT 50",
    )?;

    let productos = stmt
        .query_map(rusqlite::params![busqueda], |row| {
            Ok(ProductoBusqueda {
                id: row.get(0)?,
                codigo: row.get(1)?,
                marca: row.get(2)?,
                modelo: row.get(3)?,
                color: row.get(4)?,
                precio: utils::leer_decimal(row, 5)?,
                stock_actual: row.get(6)?,
                stock_minimo: row.get(7)?,
                catalogo_nombre: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(productos)
}

pub fn listar_productos(db: &Database, solo_activos: bool) -> Result<Vec<Producto>, AppError> {
    let conn = db.conexion()?;

    let sql = if solo_activos {
        format!(
            "SELECT {} FROM productos WHERE activo = 1 ORDER BY codigo",
            COLUMNAS_PRODUCTO
        )
    } else {
        format!("SELECT {} FROM productos ORDER BY codigo", COLUMNAS_PRODUCTO)
    };

    let mut stmt = conn.prepare(&sql)?;
    let productos = stmt
        .query_map([], mapear_producto)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(productos)
}

// --- Catálogos ---

pub fn crear_catalogo(db: &Database, catalogo: Catalogo) -> Result<i64, AppError> {
    let conn = db.conexion()?;

    conn.execute(
        "INSERT INTO catalogos (nombre, temporada, es_oferta, activo,
         fecha_inicio_vigencia, fecha_fin_vigencia)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            catalogo.nombre,
            catalogo.temporada,
            catalogo.es_oferta as i32,
            catalogo.activo as i32,
            catalogo.fecha_inicio_vigencia,
            catalogo.fecha_fin_vigencia,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn listar_catalogos(db: &Database) -> Result<Vec<Catalogo>, AppError> {
    let conn = db.conexion()?;

    let mut stmt = conn.prepare(
        "SELECT id, nombre, temporada, es_oferta, activo,
                fecha_inicio_vigencia, fecha_fin_vigencia
         FROM catalogos WHERE activo = 1 ORDER BY nombre",
    )?;
    let catalogos = stmt
        .query_map([], |row| {
            Ok(Catalogo {
                id: Some(row.get(0)?),
                nombre: row.get(1)?,
                temporada: row.get(2)?,
                es_oferta: row.get::<_, i64>(3)? != 0,
                activo: row.get::<_, i64>(4)? != 0,
                fecha_inicio_vigencia: row.get(5)?,
                fecha_fin_vigencia: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(catalogos)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn producto_de_prueba(codigo: &str) -> Producto {
        Producto {
            id: None,
            codigo: codigo.to_string(),
            marca: "ANDREA".to_string(),
            modelo: "BOTIN-225".to_string(),
            color: "NEGRO".to_string(),
            propiedad: Some("24".to_string()),
            costo: dec!(320.00),
            precio: dec!(550.00),
            temporada: Some("OTOÑO".to_string()),
            oferta: false,
            admite_devolucion: true,
            stock_actual: 10,
            stock_minimo: 5,
            proveedor_id: None,
            catalogo_id: None,
            activo: true,
        }
    }

    #[test]
    fn test_crear_y_obtener_producto() {
        let db = Database::abrir_en_memoria().unwrap();
        let id = crear_producto(&db, producto_de_prueba("AN-225-NEG-24")).unwrap();

        let producto = obtener_producto(&db, id).unwrap();
        assert_eq!(producto.codigo, "AN-225-NEG-24");
        assert_eq!(producto.precio, dec!(550.00));
        assert_eq!(producto.stock_actual, 10);
    }

    #[test]
    fn test_codigo_duplicado() {
        let db = Database::abrir_en_memoria().unwrap();
        crear_producto(&db, producto_de_prueba("AN-225-NEG-24")).unwrap();
        let err = crear_producto(&db, producto_de_prueba("AN-225-NEG-24"));
        assert!(matches!(err, Err(AppError::Database(_))));
    }

    #[test]
    fn test_buscar_por_marca() {
        let db = Database::abrir_en_memoria().unwrap();
        crear_producto(&db, producto_de_prueba("AN-225-NEG-24")).unwrap();
        let mut otro = producto_de_prueba("FL-100-CAF-26");
        otro.marca = "FLEXI".to_string();
        crear_producto(&db, otro).unwrap();

        let resultado = buscar_productos(&db, "FLEXI").unwrap();
        assert_eq!(resultado.len(), 1);
        assert_eq!(resultado[0].codigo, "FL-100-CAF-26");
    }
}
