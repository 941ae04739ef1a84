use crate::application::messages;
use crate::config::SchoolInfo;
use crate::domain::debt::compute_debt;
use crate::domain::ports::{ClockRef, GuardianRegistryRef, MessageSenderRef};
use crate::domain::session::ConversationState;
use crate::domain::student::StudentRecord;
use crate::error::Result;
use crate::infrastructure::session_store::SessionStore;
use crate::interfaces::csv::pin_ledger::PinLedger;
use crate::interfaces::csv::student_ledger::StudentLedger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pause before the main menu is re-shown after a report, so the user can
/// read the report first.
const MENU_REDISPLAY_DELAY: Duration = Duration::from_millis(1500);

/// The conversation state machine.
///
/// One inbound message is one call to [`handle_message`]; the engine reads
/// the sender's session, dispatches on it, talks to the domain services and
/// writes the next state back. Every inbound message produces at least one
/// outbound message, even when a lookup fails.
///
/// `Clone` is shallow; clones share sessions, ledgers and the pending
/// deferred-menu tasks.
///
/// [`handle_message`]: ConversationEngine::handle_message
#[derive(Clone)]
pub struct ConversationEngine {
    sessions: SessionStore,
    guardians: GuardianRegistryRef,
    students: StudentLedger,
    pins: PinLedger,
    outbound: MessageSenderRef,
    clock: ClockRef,
    school: SchoolInfo,
    menu_delay: Duration,
    pending_menus: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl ConversationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: SessionStore,
        guardians: GuardianRegistryRef,
        students: StudentLedger,
        pins: PinLedger,
        outbound: MessageSenderRef,
        clock: ClockRef,
        school: SchoolInfo,
    ) -> Self {
        Self {
            sessions,
            guardians,
            students,
            pins,
            outbound,
            clock,
            school,
            menu_delay: MENU_REDISPLAY_DELAY,
            pending_menus: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Overrides the menu re-display delay; tests shorten it.
    pub fn with_menu_delay(mut self, delay: Duration) -> Self {
        self.menu_delay = delay;
        self
    }

    /// Processes one inbound message from `sender`.
    pub async fn handle_message(&self, sender: &str, text: &str) {
        self.cancel_pending_menu(sender).await;

        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let Err(err) = self.dispatch(sender, text).await {
            warn!(sender, error = %err, "message handling failed");
            self.outbound.send(sender, messages::LOOKUP_FAILED).await;
            self.send_main_menu(sender).await;
        }
    }

    async fn dispatch(&self, sender: &str, text: &str) -> Result<()> {
        // The menu command always works, whatever state the sender is in.
        let lowered = text.to_lowercase();
        if lowered == "menu" || lowered == "menú" {
            self.send_main_menu(sender).await;
            return Ok(());
        }

        let state = self.sessions.get(sender).await;
        debug!(sender, ?state, "dispatching");
        match state {
            ConversationState::MainMenu => self.on_main_menu(sender, text).await,
            ConversationState::AwaitingId => self.on_awaiting_id(sender, text).await,
            ConversationState::AwaitingPin { student_id } => {
                self.on_awaiting_pin(sender, text, &student_id).await
            }
            ConversationState::SelectingStudent { candidates } => {
                self.on_selecting_student(sender, text, &candidates).await
            }
            ConversationState::RemovingStudent { candidates } => {
                self.on_removing_student(sender, text, &candidates).await
            }
        }
    }

    async fn on_main_menu(&self, sender: &str, text: &str) -> Result<()> {
        match text {
            "1" => {
                self.sessions.set(sender, ConversationState::AwaitingId).await;
                self.outbound.send(sender, messages::REGISTER_PROMPT).await;
            }
            "2" => self.on_query_payments(sender).await?,
            "3" => {
                self.outbound
                    .send(sender, &messages::school_info(&self.school))
                    .await;
            }
            "4" => {
                self.outbound
                    .send(sender, &messages::contact_info(&self.school))
                    .await;
            }
            "5" => self.on_start_removal(sender).await?,
            _ => {
                self.outbound.send(sender, messages::INVALID_OPTION).await;
                self.send_main_menu(sender).await;
            }
        }
        Ok(())
    }

    async fn on_query_payments(&self, sender: &str) -> Result<()> {
        let students = self.guardians.list_students(sender).await?;
        match students.len() {
            0 => {
                self.outbound.send(sender, messages::NO_STUDENTS).await;
                self.send_main_menu(sender).await;
            }
            1 => match self.students.find_student(&students[0]).await? {
                Some(student) => {
                    self.send_payment_status(sender, &student).await;
                    self.sessions.set(sender, ConversationState::MainMenu).await;
                    self.schedule_menu_redisplay(sender).await;
                }
                None => {
                    self.outbound
                        .send(sender, messages::REGISTERED_STUDENT_MISSING)
                        .await;
                    self.send_main_menu(sender).await;
                }
            },
            _ => {
                let entries = self.resolve_list_entries(&students).await?;
                let list =
                    messages::student_list(messages::SELECT_LIST_TITLE, &entries, messages::SELECT_LIST_FOOTER);
                self.sessions
                    .set(sender, ConversationState::SelectingStudent { candidates: students })
                    .await;
                self.outbound.send(sender, &list).await;
            }
        }
        Ok(())
    }

    async fn on_start_removal(&self, sender: &str) -> Result<()> {
        let students = self.guardians.list_students(sender).await?;
        if students.is_empty() {
            self.outbound
                .send(sender, messages::NO_STUDENTS_TO_REMOVE)
                .await;
            self.send_main_menu(sender).await;
            return Ok(());
        }

        let entries = self.resolve_list_entries(&students).await?;
        let list =
            messages::student_list(messages::REMOVE_LIST_TITLE, &entries, messages::REMOVE_LIST_FOOTER);
        self.sessions
            .set(sender, ConversationState::RemovingStudent { candidates: students })
            .await;
        self.outbound.send(sender, &list).await;
        Ok(())
    }

    /// Name/grade pairs for the candidate list; ids that no longer resolve
    /// are left out of the display but keep their slot in the stored list.
    async fn resolve_list_entries(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(student) = self.students.find_student(id).await? {
                entries.push((student.name, student.grade));
            }
        }
        Ok(entries)
    }

    async fn on_awaiting_id(&self, sender: &str, text: &str) -> Result<()> {
        let well_formed = text.len() == 13 && text.chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            self.outbound.send(sender, messages::BAD_ID_FORMAT).await;
            return Ok(());
        }

        match self.students.find_student(text).await? {
            Some(student) => {
                self.sessions
                    .set(
                        sender,
                        ConversationState::AwaitingPin {
                            student_id: text.to_string(),
                        },
                    )
                    .await;
                self.outbound
                    .send(sender, &messages::student_found(&student.name))
                    .await;
            }
            None => {
                self.outbound.send(sender, messages::ID_NOT_FOUND).await;
            }
        }
        Ok(())
    }

    async fn on_awaiting_pin(&self, sender: &str, pin: &str, student_id: &str) -> Result<()> {
        if !self.pins.validate_pin(student_id, pin).await {
            self.outbound.send(sender, messages::BAD_PIN).await;
            return Ok(());
        }

        self.guardians.add_relation(sender, student_id).await?;

        let name = match self.students.find_student(student_id).await? {
            Some(student) => student.name,
            None => student_id.to_string(),
        };
        self.outbound
            .send(sender, &messages::registration_success(&name))
            .await;

        self.sessions.set(sender, ConversationState::MainMenu).await;
        self.schedule_menu_redisplay(sender).await;
        Ok(())
    }

    async fn on_selecting_student(
        &self,
        sender: &str,
        text: &str,
        candidates: &[String],
    ) -> Result<()> {
        let Some(id) = pick_candidate(text, candidates) else {
            self.outbound.send(sender, messages::INVALID_INDEX).await;
            return Ok(());
        };

        match self.students.find_student(id).await? {
            Some(student) => {
                self.send_payment_status(sender, &student).await;
                self.sessions.set(sender, ConversationState::MainMenu).await;
                self.schedule_menu_redisplay(sender).await;
            }
            None => {
                self.outbound
                    .send(sender, messages::SELECTED_STUDENT_MISSING)
                    .await;
                self.send_main_menu(sender).await;
            }
        }
        Ok(())
    }

    async fn on_removing_student(
        &self,
        sender: &str,
        text: &str,
        candidates: &[String],
    ) -> Result<()> {
        let Some(id) = pick_candidate(text, candidates) else {
            self.outbound.send(sender, messages::INVALID_INDEX).await;
            return Ok(());
        };

        let name = match self.students.find_student(id).await? {
            Some(student) => student.name,
            None => id.to_string(),
        };

        if self.guardians.remove_relation(sender, id).await? {
            self.outbound
                .send(sender, &messages::student_removed(&name))
                .await;
        } else {
            self.outbound.send(sender, messages::REMOVE_FAILED).await;
        }

        self.sessions.set(sender, ConversationState::MainMenu).await;
        self.schedule_menu_redisplay(sender).await;
        Ok(())
    }

    async fn send_payment_status(&self, sender: &str, student: &StudentRecord) {
        let current_month = self.clock.current_month();
        let debt = compute_debt(student, current_month);
        self.outbound
            .send(sender, &messages::payment_status(student, &debt, current_month))
            .await;
    }

    /// Builds and sends the main menu, resetting the session to the menu
    /// state. Registry errors degrade to an empty student list so the menu
    /// can always be shown.
    async fn send_main_menu(&self, sender: &str) {
        let count = self
            .guardians
            .list_students(sender)
            .await
            .map(|students| students.len())
            .unwrap_or(0);
        self.sessions.set(sender, ConversationState::MainMenu).await;
        self.outbound.send(sender, &messages::main_menu(count)).await;
    }

    /// Re-shows the menu after a short delay. The task is tracked per
    /// sender and aborted when a new message arrives first, so a stale menu
    /// never lands after the user has moved on.
    async fn schedule_menu_redisplay(&self, sender: &str) {
        let engine = self.clone();
        let key = sender.to_string();
        let task_sender = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(engine.menu_delay).await;
            engine.send_main_menu(&task_sender).await;
            engine.pending_menus.lock().await.remove(&task_sender);
        });

        if let Some(previous) = self.pending_menus.lock().await.insert(key, handle) {
            previous.abort();
        }
    }

    async fn cancel_pending_menu(&self, sender: &str) {
        if let Some(handle) = self.pending_menus.lock().await.remove(sender) {
            handle.abort();
        }
    }
}

/// Resolves a 1-based numeric reply against the stored candidate list.
fn pick_candidate<'c>(text: &str, candidates: &'c [String]) -> Option<&'c String> {
    let index: usize = text.parse().ok()?;
    if index == 0 {
        return None;
    }
    candidates.get(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::ports::GuardianRegistry;
    use crate::infrastructure::clock::MockClock;
    use crate::infrastructure::file_cache::RemoteFileCache;
    use crate::infrastructure::in_memory::{
        InMemoryGuardianRegistry, InMemoryRemoteStore, RecordingSender,
    };

    const STUDENTS_PATH: &str = "/datos_estudiantes.csv";
    const PINS_PATH: &str = "/relaciones.csv";

    struct Harness {
        engine: ConversationEngine,
        sender: RecordingSender,
        guardians: InMemoryGuardianRegistry,
        store: InMemoryRemoteStore,
        clock: MockClock,
        _cache_dir: tempfile::TempDir,
    }

    fn ledger_row(name: &str, grade: &str, id: &str, fee: &str, paid: usize) -> String {
        let mut cells = vec![String::new(); 34];
        cells[0] = name.to_string();
        cells[1] = grade.to_string();
        cells[5] = id.to_string();
        cells[13] = fee.to_string();
        for offset in 0..paid {
            cells[22 + offset] = "x".to_string();
        }
        cells.join(",")
    }

    async fn harness(rows: &[String], pins: &str) -> Harness {
        let store = InMemoryRemoteStore::new();
        let mut body = String::from("ENCABEZADO\nSUBENCABEZADO\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        store.put(STUDENTS_PATH, body.into_bytes(), "rev-1").await;
        store.put(PINS_PATH, pins.as_bytes().to_vec(), "rev-1").await;

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            RemoteFileCache::new(Arc::new(store.clone()), cache_dir.path().to_path_buf())
                .unwrap(),
        );
        let clock = MockClock::new(3);
        let sender = RecordingSender::new();
        let guardians = InMemoryGuardianRegistry::new();

        let engine = ConversationEngine::new(
            SessionStore::new(Arc::new(clock.clone())),
            Arc::new(guardians.clone()),
            StudentLedger::new(Arc::clone(&cache), STUDENTS_PATH.to_string()),
            PinLedger::new(cache, PINS_PATH.to_string()),
            Arc::new(sender.clone()),
            Arc::new(clock.clone()),
            Config::default().school,
        )
        // Long enough that deferred menus never fire mid-test; the
        // redisplay test opts into a zero delay explicitly.
        .with_menu_delay(Duration::from_secs(60));

        Harness {
            engine,
            sender,
            guardians,
            store,
            clock,
            _cache_dir: cache_dir,
        }
    }

    fn default_rows() -> Vec<String> {
        vec![
            ledger_row("Ana López", "7-A", "0801199901234", "1200", 3),
            ledger_row("Juan Pérez", "8-B", "0801199905678", "1500", 1),
        ]
    }

    const DEFAULT_PINS: &str = "ID,PIN\n0801199901234,4321\n0801199905678,9876\n";

    #[tokio::test]
    async fn test_query_without_students_reports_none() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "2").await;

        let texts = h.sender.texts().await;
        assert!(texts[0].contains("No tiene alumnos"));
        assert!(texts[1].contains("BIENVENIDO AL SISTEMA ESCOLAR"));
    }

    #[tokio::test]
    async fn test_invalid_option_reshows_menu() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "9").await;

        let texts = h.sender.texts().await;
        assert!(texts[0].contains("Opción no válida"));
        assert!(texts[1].contains("BIENVENIDO"));
    }

    #[tokio::test]
    async fn test_bad_id_format_keeps_awaiting_id() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;
        h.engine.handle_message("guardian", "12345").await;

        assert!(h.sender.last_text().await.unwrap().contains("Formato incorrecto"));
        // Still awaiting the id: a well-formed one is accepted next.
        h.engine.handle_message("guardian", "0801199901234").await;
        assert!(h.sender.last_text().await.unwrap().contains("Alumno encontrado"));
    }

    #[tokio::test]
    async fn test_unknown_id_reports_not_found() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;
        h.engine.handle_message("guardian", "9999999999999").await;
        assert!(h.sender.last_text().await.unwrap().contains("no está registrado"));
    }

    #[tokio::test]
    async fn test_registration_flow_creates_relation_once() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;
        h.engine.handle_message("guardian", "0801199901234").await;
        h.engine.handle_message("guardian", "4321").await;

        let texts = h.sender.texts().await;
        assert!(texts.iter().any(|t| t.contains("REGISTRO EXITOSO")));
        assert_eq!(
            h.guardians.list_students("guardian").await.unwrap(),
            vec!["0801199901234"]
        );

        // Retrying the PIN after success lands in the main menu and never
        // duplicates the relation.
        h.engine.handle_message("guardian", "4321").await;
        assert_eq!(h.guardians.list_students("guardian").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_pin_stays_awaiting_pin() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;
        h.engine.handle_message("guardian", "0801199901234").await;
        h.engine.handle_message("guardian", "0000").await;

        assert!(h.sender.last_text().await.unwrap().contains("PIN incorrecto"));
        assert!(h.guardians.list_students("guardian").await.unwrap().is_empty());

        h.engine.handle_message("guardian", "4321").await;
        assert_eq!(h.guardians.list_students("guardian").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_student_query_reports_debt() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.guardians.add_relation("guardian", "0801199905678").await.unwrap();
        // Paid through enero, queried in marzo: two months of 1500 owed.
        h.engine.handle_message("guardian", "2").await;

        let report = h.sender.texts().await[0].clone();
        assert!(report.contains("ESTADO DE PAGOS - JUAN PÉREZ"));
        assert!(report.contains("▫️ Enero: ✅ Pagado"));
        assert!(report.contains("▫️ Marzo: ❌ Pendiente"));
        assert!(report.contains("DEUDA TOTAL: L.3000.00"));
    }

    #[tokio::test]
    async fn test_multiple_students_use_selection_list() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();
        h.guardians.add_relation("guardian", "0801199905678").await.unwrap();

        h.engine.handle_message("guardian", "2").await;
        let list = h.sender.last_text().await.unwrap();
        assert!(list.contains("SELECCIONE ALUMNO"));
        assert!(list.contains("1. Ana López - 7-A"));
        assert!(list.contains("2. Juan Pérez - 8-B"));

        h.engine.handle_message("guardian", "2").await;
        let report = h.sender.last_text().await.unwrap();
        assert!(report.contains("JUAN PÉREZ"));
    }

    #[tokio::test]
    async fn test_selection_out_of_range_reprompts() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();
        h.guardians.add_relation("guardian", "0801199905678").await.unwrap();
        h.engine.handle_message("guardian", "2").await;

        h.engine.handle_message("guardian", "7").await;
        assert!(h.sender.last_text().await.unwrap().contains("número de la lista"));

        // The candidate list is still active.
        h.engine.handle_message("guardian", "1").await;
        assert!(h.sender.last_text().await.unwrap().contains("ANA LÓPEZ"));
    }

    #[tokio::test]
    async fn test_removal_flow() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();

        h.engine.handle_message("guardian", "5").await;
        assert!(h.sender.last_text().await.unwrap().contains("ELIMINAR ALUMNO"));

        h.engine.handle_message("guardian", "1").await;
        let texts = h.sender.texts().await;
        assert!(texts.iter().any(|t| t.contains("eliminado de su cuenta")));
        assert!(h.guardians.list_students("guardian").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removal_without_students() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "5").await;
        assert!(h.sender.texts().await[0].contains("para eliminar"));
    }

    #[tokio::test]
    async fn test_menu_command_resets_any_state() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;
        h.engine.handle_message("guardian", "MENÚ").await;

        assert!(h.sender.last_text().await.unwrap().contains("BIENVENIDO"));
        // Back at the menu: "1" is an option again, not an id attempt.
        h.engine.handle_message("guardian", "1").await;
        assert!(h.sender.last_text().await.unwrap().contains("REGISTRO DE ALUMNO"));
    }

    #[tokio::test]
    async fn test_lookup_failure_apologizes_and_resets() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();
        h.store.fail_metadata(true);
        h.store.fail_download(true);

        h.engine.handle_message("guardian", "2").await;
        let texts = h.sender.texts().await;
        assert!(texts[0].contains("Ocurrió un error"));
        assert!(texts[1].contains("BIENVENIDO"));

        // The session is usable again afterwards.
        h.store.fail_metadata(false);
        h.store.fail_download(false);
        h.engine.handle_message("guardian", "3").await;
        assert!(h.sender.last_text().await.unwrap().contains("INFORMACIÓN DE LA ESCUELA"));
    }

    #[tokio::test]
    async fn test_expired_session_falls_back_to_menu() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        h.engine.handle_message("guardian", "1").await;

        h.clock.advance(10 * 60 * 1000 + 1);
        // "3" would be a malformed id, but the expired session is back at
        // the menu where it means school info.
        h.engine.handle_message("guardian", "3").await;
        assert!(h.sender.last_text().await.unwrap().contains("INFORMACIÓN DE LA ESCUELA"));
    }

    #[tokio::test]
    async fn test_menu_redisplay_after_report() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        let engine = h.engine.clone().with_menu_delay(Duration::ZERO);
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();
        engine.handle_message("guardian", "2").await;

        // The deferred task runs once the handler yields.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let texts = h.sender.texts().await;
        assert!(texts[0].contains("ESTADO DE PAGOS"));
        assert!(texts.last().unwrap().contains("BIENVENIDO"));
    }

    #[tokio::test]
    async fn test_new_message_cancels_pending_redisplay() {
        let h = harness(&default_rows(), DEFAULT_PINS).await;
        let engine = h.engine.clone().with_menu_delay(Duration::from_millis(200));
        h.guardians.add_relation("guardian", "0801199901234").await.unwrap();

        engine.handle_message("guardian", "2").await;
        engine.handle_message("guardian", "3").await;

        tokio::time::sleep(Duration::from_millis(400)).await;
        let last = h.sender.last_text().await.unwrap();
        assert!(last.contains("INFORMACIÓN DE LA ESCUELA"));
    }

    #[test]
    fn test_pick_candidate_bounds() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        assert_eq!(pick_candidate("1", &candidates), Some(&candidates[0]));
        assert_eq!(pick_candidate("2", &candidates), Some(&candidates[1]));
        assert_eq!(pick_candidate("0", &candidates), None);
        assert_eq!(pick_candidate("3", &candidates), None);
        assert_eq!(pick_candidate("abc", &candidates), None);
        assert_eq!(pick_candidate("-1", &candidates), None);
    }
}
