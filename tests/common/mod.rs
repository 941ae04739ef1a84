use std::path::Path;

pub const STUDENT_COLUMNS: usize = 34;
pub const COL_NAME: usize = 0;
pub const COL_GRADE: usize = 1;
pub const COL_ID: usize = 5;
pub const COL_FEE: usize = 13;
pub const COL_FIRST_MONTH: usize = 22;

/// Builds one ledger row with the fixed column layout the bot expects.
pub fn ledger_row(name: &str, grade: &str, id: &str, fee: &str, paid_months: usize) -> String {
    let mut cells = vec![String::new(); STUDENT_COLUMNS];
    cells[COL_NAME] = name.to_string();
    cells[COL_GRADE] = grade.to_string();
    cells[COL_ID] = id.to_string();
    cells[COL_FEE] = fee.to_string();
    for offset in 0..paid_months {
        cells[COL_FIRST_MONTH + offset] = "x".to_string();
    }
    cells
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// CSV-quotes a single field so commas inside it don't split the column
/// layout (RFC 4180: wrap in quotes, double any embedded quotes).
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes a students ledger (two header rows) into `dir`.
pub fn write_students_ledger(dir: &Path, rows: &[String]) {
    let mut body = String::from("ENCABEZADO\nSUBENCABEZADO\n");
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(dir.join("datos_estudiantes.csv"), body).unwrap();
}

/// Writes a PIN ledger (one header row) into `dir`.
pub fn write_pins_ledger(dir: &Path, pairs: &[(&str, &str)]) {
    let mut body = String::from("ID,PIN\n");
    for (id, pin) in pairs {
        body.push_str(&format!("{id},{pin}\n"));
    }
    std::fs::write(dir.join("relaciones.csv"), body).unwrap();
}
