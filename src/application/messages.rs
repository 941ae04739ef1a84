//! Outbound message texts. The wording is user-facing product copy; the
//! engine decides *when* to send, this module decides *what*.

use crate::config::SchoolInfo;
use crate::domain::debt::DebtSummary;
use crate::domain::student::{Month, StudentRecord};
use rust_decimal_macros::dec;
use std::fmt::Write;

pub const REGISTER_PROMPT: &str =
    "📝 *REGISTRO DE ALUMNO*\n\nPor favor, ingrese el número de identidad del alumno (13 dígitos):";

pub const NO_STUDENTS: &str =
    "❌ No tiene alumnos registrados. Seleccione la opción 1️⃣ para registrar un alumno.";

pub const NO_STUDENTS_TO_REMOVE: &str = "❌ No tiene alumnos registrados para eliminar.";

pub const ID_NOT_FOUND: &str =
    "❌ El número de identidad no está registrado en el sistema. Verifique e intente nuevamente.";

pub const BAD_ID_FORMAT: &str = "❌ Formato incorrecto. El número de identidad debe tener 13 dígitos numéricos.\n\nIntente nuevamente o escriba *menú* para volver al menú principal.";

pub const BAD_PIN: &str = "❌ PIN incorrecto. Verifique e intente nuevamente o escriba *menú* para volver al menú principal.";

pub const INVALID_OPTION: &str = "❓ Opción no válida. Por favor seleccione una opción del menú.";

pub const INVALID_INDEX: &str =
    "❌ Opción no válida. Por favor seleccione un número de la lista.";

pub const STUDENT_MISSING: &str =
    "❌ No se encontró información del alumno. Por favor contacte a administración.";

pub const REGISTERED_STUDENT_MISSING: &str = "❌ No se encontró información del alumno registrado. Por favor contacte a administración.";

pub const SELECTED_STUDENT_MISSING: &str = "❌ No se encontró información del alumno seleccionado. Por favor contacte a administración.";

pub const REMOVE_FAILED: &str =
    "❌ Error al eliminar el alumno. Por favor contacte a administración.";

pub const LOOKUP_FAILED: &str =
    "❌ Ocurrió un error consultando la información. Por favor intente nuevamente más tarde.";

pub fn main_menu(student_count: usize) -> String {
    let mut text = String::from("🏫 *BIENVENIDO AL SISTEMA ESCOLAR*\n\n");

    if student_count > 0 {
        let _ = writeln!(text, "👨‍👩‍👧‍👦 Tiene {student_count} alumno(s) registrado(s)\n");
    }

    text.push_str("Seleccione una opción:\n\n");
    text.push_str("1️⃣ *Registrar* nuevo alumno\n");
    text.push_str("2️⃣ *Consultar* estado de pagos\n");
    text.push_str("3️⃣ *Información* de la escuela\n");
    text.push_str("4️⃣ *Contactar* administración\n");

    if student_count > 0 {
        text.push_str("5️⃣ *Eliminar* alumno de mi cuenta\n");
    }

    text.push_str("\nResponda con el número de la opción deseada.");
    text
}

pub fn student_found(name: &str) -> String {
    format!("✅ *Alumno encontrado:* {name}\n\nAhora ingrese el PIN de autorización:")
}

pub fn registration_success(name: &str) -> String {
    format!(
        "✅ *REGISTRO EXITOSO*\n\nEl alumno *{name}* ha sido vinculado a su número.\n\nYa puede consultar su estado de pagos desde el menú principal."
    )
}

pub fn student_removed(name: &str) -> String {
    format!("✅ El alumno *{name}* ha sido eliminado de su cuenta correctamente.")
}

pub fn student_list(title: &str, entries: &[(String, String)], footer: &str) -> String {
    let mut text = format!("{title}\n\n");
    for (position, (name, grade)) in entries.iter().enumerate() {
        let _ = writeln!(text, "{}. {} - {}", position + 1, name, grade);
    }
    text.push('\n');
    text.push_str(footer);
    text
}

pub const SELECT_LIST_TITLE: &str = "👨‍👩‍👧‍👦 *SELECCIONE ALUMNO*";
pub const SELECT_LIST_FOOTER: &str =
    "Responda con el número del alumno para ver su estado de pagos.";
pub const REMOVE_LIST_TITLE: &str = "🗑️ *ELIMINAR ALUMNO*";
pub const REMOVE_LIST_FOOTER: &str =
    "Responda con el número del alumno que desea eliminar de su cuenta.";

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Detailed payment-status report for a student, listing every month up to
/// the current one.
pub fn payment_status(student: &StudentRecord, debt: &DebtSummary, current_month: u32) -> String {
    let mut text = format!(
        "📊 *ESTADO DE PAGOS - {}*\n🏫 Grado: {}\n\n",
        student.name.to_uppercase(),
        student.grade
    );

    for month in Month::ALL {
        if month.number() > current_month {
            break;
        }
        let status = if student.is_paid(month) {
            "✅ Pagado"
        } else {
            "❌ Pendiente"
        };
        let _ = writeln!(text, "▫️ {}: {}", capitalize(month.key()), status);
    }

    let _ = write!(text, "\n💵 Cuota mensual: L.{:.2}", debt.monthly_fee);
    let _ = write!(text, "\n📅 Meses pendientes: {}", debt.pending_months.len());
    if debt.up_to_date {
        text.push_str("\n\n✅ *AL DÍA EN PAGOS*");
    } else {
        let _ = write!(
            text,
            "\n\n❌ *DEUDA TOTAL: L.{:.2}*\n(Cuota × Meses pendientes)",
            debt.total_owed
        );
    }

    // A fee this low almost always means the ledger cell failed to
    // normalize; surface the raw cell so administration can fix the data.
    if student.monthly_fee < dec!(10) {
        let _ = write!(text, "\n\n[DEBUG] Valor original: {:?}", student.raw_fee);
    }

    text
}

pub fn school_info(school: &SchoolInfo) -> String {
    let mut text = String::from("📚 *INFORMACIÓN DE LA ESCUELA*\n\n");
    let _ = writeln!(text, "*{}*\n", school.nombre);
    let _ = writeln!(text, "📍 *Dirección:* {}", school.direccion);
    let _ = writeln!(text, "📞 *Teléfono:* {}", school.telefono);
    let _ = writeln!(text, "📧 *Email:* {}", school.email);
    let _ = writeln!(text, "⏰ *Horario:* {}", school.horario);
    let _ = writeln!(text, "🌐 *Sitio Web:* {}\n", school.sitio_web);
    text.push_str("Escriba *menú* para volver al menú principal.");
    text
}

pub fn contact_info(school: &SchoolInfo) -> String {
    let mut text = String::from("📞 *CONTACTAR ADMINISTRACIÓN*\n\n");
    text.push_str("Para consultas administrativas puede comunicarse al:\n");
    let _ = writeln!(text, "📱 *WhatsApp:* {}", school.telefono);
    let _ = writeln!(text, "📧 *Email:* {}\n", school.email);
    text.push_str("⏰ *Horario de atención:*\n");
    let _ = writeln!(text, "{}\n", school.horario);
    text.push_str("Escriba *menú* para volver al menú principal.");
    text
}
