use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Configuración del negocio
        CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Contadores atómicos para folios (órdenes, notas de crédito)
        CREATE TABLE IF NOT EXISTS secuenciales (
            clave TEXT PRIMARY KEY,
            valor INTEGER NOT NULL DEFAULT 0
        );

        -- Usuarios / Vendedores
        CREATE TABLE IF NOT EXISTS usuarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            pin_hash TEXT NOT NULL,
            pin_salt TEXT NOT NULL,
            rol TEXT NOT NULL DEFAULT 'VENDEDOR',
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        -- Proveedores
        CREATE TABLE IF NOT EXISTS proveedores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            contacto TEXT,
            requiere_anticipo INTEGER NOT NULL DEFAULT 0,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        -- Catálogos de temporada
        CREATE TABLE IF NOT EXISTS catalogos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            temporada TEXT,
            es_oferta INTEGER NOT NULL DEFAULT 0,
            activo INTEGER NOT NULL DEFAULT 1,
            fecha_inicio_vigencia TEXT,
            fecha_fin_vigencia TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        -- Productos (calzado: marca/modelo/color/talla)
        CREATE TABLE IF NOT EXISTS productos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo TEXT UNIQUE NOT NULL,
            marca TEXT NOT NULL,
            modelo TEXT NOT NULL,
            color TEXT NOT NULL,
            propiedad TEXT,
            costo TEXT NOT NULL DEFAULT '0',
            precio TEXT NOT NULL DEFAULT '0',
            temporada TEXT,
            oferta INTEGER NOT NULL DEFAULT 0,
            admite_devolucion INTEGER NOT NULL DEFAULT 1,
            stock_actual INTEGER NOT NULL DEFAULT 0,
            stock_minimo INTEGER NOT NULL DEFAULT 5,
            proveedor_id INTEGER REFERENCES proveedores(id),
            catalogo_id INTEGER REFERENCES catalogos(id),
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_productos_codigo ON productos(codigo);
        CREATE INDEX IF NOT EXISTS idx_productos_marca ON productos(marca);
        CREATE INDEX IF NOT EXISTS idx_productos_catalogo ON productos(catalogo_id);

        -- Clientes (distribuidoras)
        CREATE TABLE IF NOT EXISTS clientes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            contacto TEXT,
            telefono TEXT,
            email TEXT,
            observaciones TEXT,
            max_dias_devolucion INTEGER NOT NULL DEFAULT 30,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_clientes_nombre ON clientes(nombre);

        -- Órdenes de cliente: agrupan el negocio pendiente de una distribuidora
        CREATE TABLE IF NOT EXISTS ordenes_cliente (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_orden TEXT UNIQUE NOT NULL,
            cliente_id INTEGER NOT NULL REFERENCES clientes(id),
            estado TEXT NOT NULL DEFAULT 'ACTIVO',
            fecha_creacion TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            fecha_cierre TEXT,
            total_productos INTEGER NOT NULL DEFAULT 0,
            productos_recibidos INTEGER NOT NULL DEFAULT 0,
            monto_total TEXT NOT NULL DEFAULT '0',
            anticipos_pagados TEXT NOT NULL DEFAULT '0',
            observaciones TEXT,
            usuario TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_ordenes_cliente ON ordenes_cliente(cliente_id);
        CREATE INDEX IF NOT EXISTS idx_ordenes_estado ON ordenes_cliente(estado);

        -- Pedidos individuales (pueden plegarse a una orden de cliente)
        CREATE TABLE IF NOT EXISTS pedidos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cliente_id INTEGER NOT NULL REFERENCES clientes(id),
            fecha TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            estado TEXT NOT NULL DEFAULT 'PENDIENTE',
            tipo TEXT NOT NULL DEFAULT 'VENTA',
            total TEXT NOT NULL DEFAULT '0',
            descuento_aplicado TEXT NOT NULL DEFAULT '0',
            pagado INTEGER NOT NULL DEFAULT 0,
            orden_cliente_id INTEGER REFERENCES ordenes_cliente(id),
            usuario TEXT,
            usuario_id INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_pedidos_cliente ON pedidos(cliente_id);
        CREATE INDEX IF NOT EXISTS idx_pedidos_estado ON pedidos(estado);

        CREATE TABLE IF NOT EXISTS detalle_pedidos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pedido_id INTEGER NOT NULL REFERENCES pedidos(id) ON DELETE CASCADE,
            producto_id INTEGER NOT NULL REFERENCES productos(id),
            cantidad INTEGER NOT NULL,
            precio_unitario TEXT NOT NULL,
            subtotal TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_detalle_pedidos_pedido ON detalle_pedidos(pedido_id);

        -- Notas de crédito / débito por cliente
        CREATE TABLE IF NOT EXISTS notas_credito (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_nota TEXT UNIQUE NOT NULL,
            cliente_id INTEGER NOT NULL REFERENCES clientes(id),
            tipo TEXT NOT NULL,
            monto TEXT NOT NULL,
            motivo TEXT NOT NULL DEFAULT '',
            origen_orden_id INTEGER REFERENCES ordenes_cliente(id),
            orden_aplicacion_id INTEGER REFERENCES ordenes_cliente(id),
            fecha_expiracion TEXT NOT NULL,
            aplicada INTEGER NOT NULL DEFAULT 0,
            fecha_aplicacion TEXT,
            usuario TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_notas_cliente ON notas_credito(cliente_id);
        CREATE INDEX IF NOT EXISTS idx_notas_aplicada ON notas_credito(aplicada);
        CREATE INDEX IF NOT EXISTS idx_notas_expiracion ON notas_credito(fecha_expiracion);

        -- Entregas parciales contra una orden de cliente
        CREATE TABLE IF NOT EXISTS entregas_parciales (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_ticket TEXT UNIQUE NOT NULL,
            orden_cliente_id INTEGER NOT NULL REFERENCES ordenes_cliente(id),
            total_productos_entregados INTEGER NOT NULL DEFAULT 0,
            monto_parcial TEXT NOT NULL DEFAULT '0',
            productos_entregados TEXT NOT NULL DEFAULT '[]',
            confirmado_por_cliente INTEGER NOT NULL DEFAULT 0,
            fecha_entrega TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            usuario TEXT,
            observaciones TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_entregas_orden ON entregas_parciales(orden_cliente_id);

        -- Seguimiento por producto dentro de una orden
        CREATE TABLE IF NOT EXISTS seguimiento_productos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            orden_cliente_id INTEGER NOT NULL REFERENCES ordenes_cliente(id),
            producto_id INTEGER NOT NULL REFERENCES productos(id),
            cantidad INTEGER NOT NULL DEFAULT 1,
            estado TEXT NOT NULL DEFAULT 'PEDIDO',
            fecha_entrega_estimada TEXT,
            fecha_cambio TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            observaciones TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_seguimiento_orden ON seguimiento_productos(orden_cliente_id);
        CREATE INDEX IF NOT EXISTS idx_seguimiento_estado ON seguimiento_productos(estado);

        -- Devoluciones de clientes
        CREATE TABLE IF NOT EXISTS devoluciones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cliente_id INTEGER NOT NULL REFERENCES clientes(id),
            producto_id INTEGER NOT NULL REFERENCES productos(id),
            tipo TEXT NOT NULL,
            motivo TEXT,
            estado TEXT NOT NULL DEFAULT 'PENDIENTE',
            confirmacion_proveedor INTEGER NOT NULL DEFAULT 0,
            afecta_inventario INTEGER NOT NULL DEFAULT 1,
            saldo_a_favor_generado TEXT NOT NULL DEFAULT '0',
            nota_credito_id INTEGER REFERENCES notas_credito(id),
            fecha TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            usuario TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_devoluciones_cliente ON devoluciones(cliente_id);
        CREATE INDEX IF NOT EXISTS idx_devoluciones_estado ON devoluciones(estado);

        -- Caja (apertura y cierre)
        CREATE TABLE IF NOT EXISTS caja (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fecha_apertura TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            fecha_cierre TEXT,
            fondo_inicial TEXT NOT NULL DEFAULT '0',
            ingresos TEXT NOT NULL DEFAULT '0',
            egresos TEXT NOT NULL DEFAULT '0',
            saldo_esperado TEXT NOT NULL DEFAULT '0',
            saldo_real TEXT,
            diferencia TEXT,
            estado TEXT NOT NULL DEFAULT 'ABIERTA',
            usuario TEXT,
            usuario_id INTEGER,
            observacion TEXT
        );

        -- Movimientos de caja
        CREATE TABLE IF NOT EXISTS transacciones_caja (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            caja_id INTEGER NOT NULL REFERENCES caja(id),
            tipo TEXT NOT NULL,
            monto TEXT NOT NULL,
            descripcion TEXT,
            referencia TEXT,
            fecha TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            usuario TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_transacciones_caja ON transacciones_caja(caja_id);

        -- Configuración inicial
        INSERT OR IGNORE INTO config (key, value) VALUES ('nombre_negocio', 'Pronto Shoes');
        INSERT OR IGNORE INTO config (key, value) VALUES ('direccion', '');
        INSERT OR IGNORE INTO config (key, value) VALUES ('telefono', '');
        INSERT OR IGNORE INTO config (key, value) VALUES ('moneda', 'MXN');
        INSERT OR IGNORE INTO config (key, value) VALUES ('dias_vigencia_nota_credito', '60');
        INSERT OR IGNORE INTO config (key, value) VALUES ('dias_entrega_estimada', '15');
        INSERT OR IGNORE INTO config (key, value) VALUES ('dias_cliente_inactivo', '30');
        ",
    )?;

    // --- Migraciones incrementales ---
    // Columna usuario en ordenes_cliente (bases creadas antes de auditar al vendedor)
    let _ = conn.execute("ALTER TABLE ordenes_cliente ADD COLUMN usuario TEXT", []);
    // Columna nota_credito_id en devoluciones (enlace a la nota generada al validar)
    let _ = conn.execute(
        "ALTER TABLE devoluciones ADD COLUMN nota_credito_id INTEGER REFERENCES notas_credito(id)",
        [],
    );

    Ok(())
}
