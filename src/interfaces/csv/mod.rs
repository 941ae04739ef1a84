pub mod pin_ledger;
pub mod student_ledger;
