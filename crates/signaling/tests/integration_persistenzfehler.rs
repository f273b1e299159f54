//! Integrationstests fuer das Verhalten bei Persistenzfehlern
//!
//! Eine stoerbare Datenbank-Huelle laesst gezielt einzelne Schreib-
//! Operationen fehlschlagen: ohne erfolgreiche Speicherung darf kein
//! Fan-out passieren, und eine nicht persistierbare Annahme baut den
//! Anruf wieder ab statt mit inkonsistentem Datensatz weiterzulaufen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tandem_auth::{Identitaet, StaticTokenVerifier};
use tandem_core::types::{CallId, ConversationId, UserId};
use tandem_db::models::{
    AnrufRecord, AnrufUpdate, KonversationRecord, NachrichtRecord, NeueNachricht,
};
use tandem_db::{
    CallRepository, ConversationRepository, DbError, DbResult, MemoryDatenbank, MessageRepository,
};
use tandem_protocol::events::{ClientEvent, NachrichtenTyp, ServerEvent};
use tandem_signaling::{DispatcherContext, EventDispatcher, SignalingConfig, SignalingState};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Stoerbare Datenbank
// ---------------------------------------------------------------------------

/// Datenbank-Huelle, deren Schreiboperationen per Schalter fehlschlagen
///
/// Clone teilt die Schalter und den inneren Zustand.
#[derive(Clone)]
struct StoerbareDatenbank {
    speicher: MemoryDatenbank,
    nachricht_fehler: Arc<AtomicBool>,
    anruf_update_fehler: Arc<AtomicBool>,
}

impl StoerbareDatenbank {
    fn neu() -> Self {
        Self {
            speicher: MemoryDatenbank::neu(),
            nachricht_fehler: Arc::new(AtomicBool::new(false)),
            anruf_update_fehler: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ausfall() -> DbError {
        DbError::Verbindung("Datenbank nicht erreichbar".into())
    }
}

impl ConversationRepository for StoerbareDatenbank {
    async fn laden(&self, id: ConversationId) -> DbResult<Option<KonversationRecord>> {
        self.speicher.laden(id).await
    }

    async fn fuer_benutzer(&self, user_id: UserId) -> DbResult<Vec<KonversationRecord>> {
        self.speicher.fuer_benutzer(user_id).await
    }

    async fn erstellen(&self, a: UserId, b: UserId) -> DbResult<KonversationRecord> {
        self.speicher.erstellen(a, b).await
    }
}

impl MessageRepository for StoerbareDatenbank {
    async fn nachricht_erstellen(&self, neu: NeueNachricht) -> DbResult<NachrichtRecord> {
        if self.nachricht_fehler.load(Ordering::SeqCst) {
            return Err(Self::ausfall());
        }
        self.speicher.nachricht_erstellen(neu).await
    }

    async fn als_gelesen_markieren(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
    ) -> DbResult<u64> {
        self.speicher
            .als_gelesen_markieren(conversation_id, sender_id)
            .await
    }
}

impl CallRepository for StoerbareDatenbank {
    async fn anruf_erstellen(
        &self,
        anrufer: UserId,
        angerufener: UserId,
    ) -> DbResult<AnrufRecord> {
        self.speicher.anruf_erstellen(anrufer, angerufener).await
    }

    async fn anruf_aktualisieren(&self, id: CallId, update: AnrufUpdate) -> DbResult<bool> {
        if self.anruf_update_fehler.load(Ordering::SeqCst) {
            return Err(Self::ausfall());
        }
        self.speicher.anruf_aktualisieren(id, update).await
    }
}

// ---------------------------------------------------------------------------
// Test-Harness
// ---------------------------------------------------------------------------

type TestState = Arc<SignalingState<StoerbareDatenbank, StaticTokenVerifier>>;

struct TestUmgebung {
    state: TestState,
    db: StoerbareDatenbank,
    verifier: StaticTokenVerifier,
}

fn test_umgebung() -> TestUmgebung {
    let db = StoerbareDatenbank::neu();
    let verifier = StaticTokenVerifier::neu();
    let config = SignalingConfig {
        // Kein Klingel-Timer in diesen Tests
        klingel_timeout_sek: 0,
        ..SignalingConfig::default()
    };
    let state = SignalingState::neu(config, Arc::new(verifier.clone()), Arc::new(db.clone()));
    TestUmgebung {
        state,
        db,
        verifier,
    }
}

struct TestClient {
    dispatcher: EventDispatcher<StoerbareDatenbank, StaticTokenVerifier>,
    ctx: DispatcherContext,
    rx: mpsc::Receiver<ServerEvent>,
    user_id: UserId,
}

impl TestClient {
    async fn senden(&mut self, event: ClientEvent) -> Option<ServerEvent> {
        self.dispatcher.dispatch(event, &mut self.ctx).await
    }

    fn empfangen(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }

    fn queue_leeren(&mut self) {
        while self.empfangen().is_some() {}
    }
}

async fn verbinden(umgebung: &TestUmgebung, name: &str, user_id: UserId) -> TestClient {
    let token = format!("token-{}-{}", name, user_id.inner());
    umgebung.verifier.registrieren(
        token.clone(),
        Identitaet {
            user_id,
            anzeige_name: name.to_string(),
        },
    );

    let (tx, rx) = mpsc::channel(64);
    let mut ctx = DispatcherContext::neu("127.0.0.1:9000".parse().unwrap(), tx);
    let dispatcher = EventDispatcher::neu(Arc::clone(&umgebung.state));

    let antwort = dispatcher
        .dispatch(ClientEvent::Authenticate { token }, &mut ctx)
        .await;
    assert!(matches!(antwort, Some(ServerEvent::OnlineUsers { .. })));

    TestClient {
        dispatcher,
        ctx,
        rx,
        user_id,
    }
}

/// Legt eine Konversation an und verbindet beide Teilnehmer mit leeren Queues
async fn paar_verbinden(umgebung: &TestUmgebung) -> (ConversationId, TestClient, TestClient) {
    let uid_a = UserId::new();
    let uid_b = UserId::new();
    let konversation = umgebung.db.erstellen(uid_a, uid_b).await.unwrap();

    let mut a = verbinden(umgebung, "ana", uid_a).await;
    let mut b = verbinden(umgebung, "ben", uid_b).await;
    a.queue_leeren();
    b.queue_leeren();

    (konversation.id, a, b)
}

/// Baut einen klingelnden Anruf von `anrufer` zu `angerufener` auf
async fn anruf_starten(anrufer: &mut TestClient, angerufener: &mut TestClient) -> CallId {
    let antwort = anrufer
        .senden(ClientEvent::CallUser {
            receiver_id: angerufener.user_id,
            caller_name: "Anrufer".into(),
        })
        .await;
    let call_id = match antwort {
        Some(ServerEvent::CallInitiated { call_id, .. }) => call_id,
        andere => panic!("Erwartet CallInitiated, bekam {:?}", andere),
    };

    match angerufener.empfangen() {
        Some(ServerEvent::IncomingCall {
            call_id: eingehend, ..
        }) => assert_eq!(eingehend, call_id),
        andere => panic!("Erwartet IncomingCall, bekam {:?}", andere),
    }

    call_id
}

// ---------------------------------------------------------------------------
// Nachrichten-Relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn persistenzfehler_bricht_relay_ohne_fanout_ab() {
    let umgebung = test_umgebung();
    let (konversation, mut a, mut b) = paar_verbinden(&umgebung).await;

    umgebung.db.nachricht_fehler.store(true, Ordering::SeqCst);

    let antwort = a
        .senden(ClientEvent::SendMessage {
            conversation_id: konversation,
            content: "geht das durch?".into(),
            message_type: NachrichtenTyp::Text,
        })
        .await;
    assert!(
        matches!(antwort, Some(ServerEvent::MessageError { .. })),
        "Absender bekommt einen Fehler, bekam {:?}",
        antwort
    );

    // Ohne Persistenz kein Fan-out, auch kein Echo an den Absender
    assert!(a.empfangen().is_none(), "kein Echo ohne Speicherung");
    assert!(b.empfangen().is_none(), "kein Fan-out ohne Speicherung");
    assert_eq!(umgebung.db.speicher.nachrichten_anzahl(), 0);

    // Nach Erholung der Datenbank laeuft das Relay normal weiter
    umgebung.db.nachricht_fehler.store(false, Ordering::SeqCst);
    let antwort = a
        .senden(ClientEvent::SendMessage {
            conversation_id: konversation,
            content: "jetzt wieder".into(),
            message_type: NachrichtenTyp::Text,
        })
        .await;
    assert!(antwort.is_none());
    assert!(matches!(
        b.empfangen(),
        Some(ServerEvent::NewMessage { .. })
    ));
    assert_eq!(umgebung.db.speicher.nachrichten_anzahl(), 1);
}

// ---------------------------------------------------------------------------
// Anruf-Annahme
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fehlgeschlagene_annahme_persistenz_baut_den_anruf_ab() {
    let umgebung = test_umgebung();
    let mut a = verbinden(&umgebung, "ana", UserId::new()).await;
    let mut b = verbinden(&umgebung, "ben", UserId::new()).await;
    a.queue_leeren();
    b.queue_leeren();

    let call_id = anruf_starten(&mut a, &mut b).await;

    umgebung.db.anruf_update_fehler.store(true, Ordering::SeqCst);

    let antwort = b.senden(ClientEvent::AcceptCall { call_id }).await;
    assert!(
        matches!(antwort, Some(ServerEvent::CallError { .. })),
        "Annehmender bekommt einen Fehler, bekam {:?}",
        antwort
    );

    // Der Anrufer bekommt genau ein call_ended
    match a.empfangen() {
        Some(ServerEvent::CallEnded { call_id: beendet }) => assert_eq!(beendet, call_id),
        andere => panic!("Erwartet CallEnded, bekam {:?}", andere),
    }
    assert!(a.empfangen().is_none(), "genau ein CallEnded");

    // Session ist abgebaut, die Paar-Sperre wieder frei
    assert!(!umgebung.state.anrufe.lebt(&call_id));
    assert_eq!(umgebung.state.anrufe.anzahl(), 0);

    // Nach Erholung der Datenbank ist ein neuer Anruf zwischen dem Paar moeglich
    umgebung.db.anruf_update_fehler.store(false, Ordering::SeqCst);
    let neuer_anruf = anruf_starten(&mut a, &mut b).await;
    assert_ne!(neuer_anruf, call_id);
}
