//! ChatService – Validierung, Autorisierung und Persistenz des Relays

use std::sync::Arc;

use tandem_core::types::{ConversationId, UserId};
use tandem_db::models::{KonversationRecord, NachrichtenTyp as DbNachrichtenTyp, NeueNachricht};
use tandem_db::{ConversationRepository, MessageRepository};

use crate::error::{ChatError, ChatResult};
use crate::types::{ChatNachricht, NachrichtenTyp, ZugestellteNachricht};

/// Maximale Nachrichtenlaenge in Zeichen
const MAX_NACHRICHT_ZEICHEN: usize = 4096;

/// ChatService verwaltet das Relay von Chat-Nachrichten
///
/// Autorisierung laeuft immer gegen das ConversationRepository, niemals
/// gegen die Raum-Mitgliedschaft der Verbindung.
pub struct ChatService<R: ConversationRepository + MessageRepository> {
    repo: Arc<R>,
}

impl<R: ConversationRepository + MessageRepository> ChatService<R> {
    /// Erstellt einen neuen ChatService
    pub fn neu(repo: Arc<R>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    /// Prueft ob ein Benutzer Teilnehmer einer Konversation ist
    ///
    /// Gibt bei Erfolg den Konversations-Datensatz zurueck.
    pub async fn mitgliedschaft_pruefen(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> ChatResult<KonversationRecord> {
        let konversation = self
            .repo
            .laden(conversation_id)
            .await?
            .ok_or_else(|| ChatError::KonversationNichtGefunden(conversation_id.to_string()))?;

        if !konversation.hat_teilnehmer(&user_id) {
            return Err(ChatError::KeineBerechtigung(
                "Benutzer ist kein Teilnehmer der Konversation".into(),
            ));
        }

        Ok(konversation)
    }

    /// Nachricht validieren, autorisieren und persistieren
    ///
    /// Schlaegt die Persistenz fehl, wird nichts zugestellt – der Aufrufer
    /// darf ohne `Ok` kein Event emittieren.
    pub async fn nachricht_senden(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        sender_name: &str,
        content: &str,
        typ: NachrichtenTyp,
    ) -> ChatResult<ZugestellteNachricht> {
        if content.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }

        if content.chars().count() > MAX_NACHRICHT_ZEICHEN {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {} Zeichen (Maximum: {})",
                content.chars().count(),
                MAX_NACHRICHT_ZEICHEN
            )));
        }

        let konversation = self.mitgliedschaft_pruefen(conversation_id, sender_id).await?;
        // Nach mitgliedschaft_pruefen ist sender_id garantiert Teilnehmer
        let partner = konversation
            .partner_von(&sender_id)
            .ok_or_else(|| ChatError::KeineBerechtigung("Kein Partner aufloesbar".into()))?;

        let record = self
            .repo
            .nachricht_erstellen(NeueNachricht {
                conversation_id,
                sender_id,
                content: content.to_string(),
                message_type: typ_zu_db(typ),
            })
            .await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            sender_id = %sender_id,
            message_id = %record.id,
            "Nachricht persistiert"
        );

        Ok(ZugestellteNachricht {
            nachricht: ChatNachricht {
                id: record.id,
                conversation_id: record.conversation_id,
                sender_id: record.sender_id,
                sender_name: sender_name.to_string(),
                content: record.content,
                message_type: typ,
                created_at: record.created_at,
            },
            partner,
        })
    }

    /// Markiert die Nachrichten der Gegenstelle als gelesen
    ///
    /// Gibt die Gegenstelle zurueck, damit der Aufrufer ihr ein
    /// `messages_read`-Event zustellen kann.
    pub async fn als_gelesen_markieren(
        &self,
        conversation_id: ConversationId,
        leser: UserId,
    ) -> ChatResult<UserId> {
        let konversation = self.mitgliedschaft_pruefen(conversation_id, leser).await?;
        let partner = konversation
            .partner_von(&leser)
            .ok_or_else(|| ChatError::KeineBerechtigung("Kein Partner aufloesbar".into()))?;

        let geaendert = self
            .repo
            .als_gelesen_markieren(conversation_id, partner)
            .await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            leser = %leser,
            geaendert,
            "Nachrichten als gelesen markiert"
        );

        Ok(partner)
    }

    /// Alle Konversations-IDs eines Benutzers (fuer den Auto-Join nach Auth)
    pub async fn konversationen_von(&self, user_id: UserId) -> ChatResult<Vec<ConversationId>> {
        let records = self.repo.fuer_benutzer(user_id).await?;
        Ok(records.into_iter().map(|k| k.id).collect())
    }
}

/// Konvertiert den Domain-Typ in den DB-Typ
fn typ_zu_db(typ: NachrichtenTyp) -> DbNachrichtenTyp {
    match typ {
        NachrichtenTyp::Text => DbNachrichtenTyp::Text,
        NachrichtenTyp::Image => DbNachrichtenTyp::Image,
        NachrichtenTyp::Audio => DbNachrichtenTyp::Audio,
    }
}
