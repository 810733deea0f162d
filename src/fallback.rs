//! Canned queries returned when no model could answer

/// Rows returned by every fallback query
pub const FALLBACK_ROW_LIMIT: usize = 10;

const CLIENTES_SQL: &str = "SELECT id, nombre, email FROM usuarios WHERE rol_id = 2";
const PRODUCTOS_SQL: &str = "SELECT id, nombre, descripcion, precio FROM productos";
const VENTAS_SQL: &str = "SELECT id, fecha_venta, monto_total, usuario_id, estado_pedido FROM ventas";
const GENERIC_SQL: &str = "SELECT id, nombre, email FROM usuarios";

/// Pick a listing query by keyword, first match wins:
/// cliente, producto, venta, then a generic listing.
pub fn fallback_sql(query: &str) -> String
{   let lower = query.to_lowercase();
    let base = if lower.contains("cliente")
    {   CLIENTES_SQL
    } else if lower.contains("producto")
    {   PRODUCTOS_SQL
    } else if lower.contains("venta")
    {   VENTAS_SQL
    } else
    {   GENERIC_SQL
    };
    format!("{} LIMIT {}", base, FALLBACK_ROW_LIMIT)
}

/// Full fallback body: format forced to json, no columns
pub fn fallback_result(query: &str) -> crate::request::GenerationResult
{   crate::request::GenerationResult::new(
      fallback_sql(query),
      crate::OutputFormat::Json
    )
}
