//! Unit-Tests fuer den ChatService

use std::sync::Arc;

use tandem_core::types::{ConversationId, UserId};
use tandem_db::{ConversationRepository, MemoryDatenbank};

use crate::error::ChatError;
use crate::service::ChatService;
use crate::types::NachrichtenTyp;

async fn setup() -> (Arc<ChatService<MemoryDatenbank>>, ConversationId, UserId, UserId) {
    let db = Arc::new(MemoryDatenbank::neu());
    let a = UserId::new();
    let b = UserId::new();
    let konv = db.erstellen(a, b).await.unwrap();
    (ChatService::neu(db), konv.id, a, b)
}

#[tokio::test]
async fn nachricht_senden_erfolgreich() {
    let (service, konv, a, b) = setup().await;

    let zugestellt = service
        .nachricht_senden(konv, a, "Ana", "hallo welt", NachrichtenTyp::Text)
        .await
        .unwrap();

    assert_eq!(zugestellt.nachricht.content, "hallo welt");
    assert_eq!(zugestellt.nachricht.sender_id, a);
    assert_eq!(zugestellt.nachricht.sender_name, "Ana");
    assert_eq!(zugestellt.nachricht.message_type, NachrichtenTyp::Text);
    assert_eq!(zugestellt.partner, b, "Partner ist die Gegenstelle");
}

#[tokio::test]
async fn fremder_sender_wird_abgelehnt() {
    let (service, konv, _a, _b) = setup().await;
    let fremd = UserId::new();

    let result = service
        .nachricht_senden(konv, fremd, "Evil", "hi", NachrichtenTyp::Text)
        .await;

    assert!(matches!(result, Err(ChatError::KeineBerechtigung(_))));
}

#[tokio::test]
async fn unbekannte_konversation_wird_abgelehnt() {
    let (service, _konv, a, _b) = setup().await;

    let result = service
        .nachricht_senden(ConversationId::new(), a, "Ana", "hi", NachrichtenTyp::Text)
        .await;

    assert!(matches!(result, Err(ChatError::KonversationNichtGefunden(_))));
}

#[tokio::test]
async fn leere_nachricht_wird_abgelehnt() {
    let (service, konv, a, _b) = setup().await;

    let result = service
        .nachricht_senden(konv, a, "Ana", "   ", NachrichtenTyp::Text)
        .await;

    assert!(matches!(result, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn zu_lange_nachricht_wird_abgelehnt() {
    let (service, konv, a, _b) = setup().await;
    let lang = "x".repeat(4097);

    let result = service
        .nachricht_senden(konv, a, "Ana", &lang, NachrichtenTyp::Text)
        .await;

    assert!(matches!(result, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn als_gelesen_markieren_liefert_partner() {
    let (service, konv, a, b) = setup().await;

    service
        .nachricht_senden(konv, a, "Ana", "ungelesen", NachrichtenTyp::Text)
        .await
        .unwrap();

    // b liest – Partner (und Empfaenger des messages_read-Events) ist a
    let partner = service.als_gelesen_markieren(konv, b).await.unwrap();
    assert_eq!(partner, a);
}

#[tokio::test]
async fn als_gelesen_markieren_fuer_fremde_schlaegt_fehl() {
    let (service, konv, _a, _b) = setup().await;
    let result = service.als_gelesen_markieren(konv, UserId::new()).await;
    assert!(matches!(result, Err(ChatError::KeineBerechtigung(_))));
}

#[tokio::test]
async fn konversationen_von_fuer_auto_join() {
    let (service, konv, a, _b) = setup().await;

    let ids = service.konversationen_von(a).await.unwrap();
    assert_eq!(ids, vec![konv]);

    assert!(service
        .konversationen_von(UserId::new())
        .await
        .unwrap()
        .is_empty());
}
