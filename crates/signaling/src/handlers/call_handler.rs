//! Anruf-Handler – Initiieren, Annehmen, Ablehnen, Beenden, Signal-Relay
//!
//! Die Zustandsuebergaenge passieren synchron im CallManager; Persistenz
//! laeuft davor bzw. danach in diesem Handler, nie unter einem Lock.
//! WebRTC-Payloads werden unveraendert an die Gegenstelle weitergereicht.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tandem_auth::{Identitaet, TokenVerifier};
use tandem_core::types::{CallId, ConnectionId, UserId};
use tandem_db::models::{AnrufStatus, AnrufUpdate};
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::{ServerEvent, SignalPayload};

use crate::dispatcher::DispatcherContext;
use crate::server_state::SignalingState;

/// Verarbeitet das Initiieren eines Anrufs
pub async fn handle_call_user<R, V>(
    receiver_id: UserId,
    caller_name: &str,
    identitaet: &Identitaet,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    let anrufer_id = identitaet.user_id;

    if receiver_id == anrufer_id {
        return Some(ServerEvent::call_error("Selbstanruf ist nicht moeglich"));
    }

    // Gegenstelle muss online sein, sonst entsteht keine Session
    let Some(empfaenger_sender) = state.presence.sender_von(&receiver_id) else {
        tracing::debug!(
            anrufer = %anrufer_id,
            angerufener = %receiver_id,
            "Anruf an Offline-Benutzer abgewiesen"
        );
        return Some(ServerEvent::call_error("Benutzer ist offline"));
    };

    // Vorab-Pruefung der Paar-Sperre, bevor ein Datensatz entsteht
    if state.anrufe.paar_belegt(&anrufer_id, &receiver_id) {
        return Some(ServerEvent::call_error(
            "Zwischen den Teilnehmern laeuft bereits ein Anruf",
        ));
    }

    // Persistenz zuerst: das Repository vergibt die massgebliche CallId
    let record = match state.db.anruf_erstellen(anrufer_id, receiver_id).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(
                anrufer = %anrufer_id,
                angerufener = %receiver_id,
                fehler = %e,
                "Anruf-Datensatz konnte nicht angelegt werden"
            );
            return Some(ServerEvent::call_error("Anruf konnte nicht angelegt werden"));
        }
    };
    let call_id = record.id;

    let anrufer_sender = ctx.sender()?;
    if let Err(e) =
        state
            .anrufe
            .anruf_erstellen(call_id, anrufer_sender, empfaenger_sender.clone())
    {
        // Verlorenes Rennen um die Paar-Sperre; den Datensatz abschliessen
        if let Err(db_e) = state
            .db
            .anruf_aktualisieren(call_id, AnrufUpdate::abgeschlossen(AnrufStatus::Beendet, Utc::now()))
            .await
        {
            tracing::warn!(call_id = %call_id, fehler = %db_e, "Anruf-Abschluss nicht persistiert");
        }
        return Some(ServerEvent::call_error(e.to_string()));
    }

    // Klingelfrist: unbeantwortete Anrufe nach Ablauf abraeumen
    if state.config.klingel_timeout_sek > 0 {
        let frist = Duration::from_secs(state.config.klingel_timeout_sek);
        let timeout_state = Arc::clone(state);
        tokio::task::spawn_local(async move {
            tokio::time::sleep(frist).await;
            klingel_timeout(call_id, &timeout_state).await;
        });
    }

    empfaenger_sender.senden(ServerEvent::IncomingCall {
        call_id,
        caller_id: anrufer_id,
        caller_name: caller_name.to_string(),
    });

    Some(ServerEvent::CallInitiated {
        call_id,
        receiver_id,
    })
}

/// Verarbeitet die Annahme eines klingelnden Anrufs
pub async fn handle_accept_call<R, V>(
    call_id: CallId,
    identitaet: &Identitaet,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    let sender = ctx.sender()?;
    let info = match state.anrufe.annehmen(call_id, identitaet.user_id, sender) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!(call_id = %call_id, fehler = %e, "Annahme abgewiesen");
            return Some(ServerEvent::call_error(e.to_string()));
        }
    };

    // Persistenz nach dem Uebergang; schlaegt sie fehl, wird der Anruf
    // wieder abgebaut statt mit inkonsistentem Datensatz weiterzulaufen
    if let Err(e) = state
        .db
        .anruf_aktualisieren(call_id, AnrufUpdate::angenommen(Utc::now()))
        .await
    {
        tracing::error!(call_id = %call_id, fehler = %e, "Annahme nicht persistiert");
        state.anrufe.beenden(call_id, identitaet.user_id);
        info.anrufer_conn.senden(ServerEvent::CallEnded { call_id });
        return Some(ServerEvent::call_error("Anruf konnte nicht gespeichert werden"));
    }

    let angenommen = ServerEvent::CallAccepted {
        call_id,
        caller_id: info.anrufer,
        receiver_id: info.angerufener,
    };
    info.anrufer_conn.senden(angenommen.clone());
    Some(angenommen)
}

/// Verarbeitet die Ablehnung eines klingelnden Anrufs
pub async fn handle_reject_call<R, V>(
    call_id: CallId,
    identitaet: &Identitaet,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    use crate::error::SignalingError;

    let session = match state.anrufe.ablehnen(call_id, identitaet.user_id) {
        Ok(session) => session,
        // Session ist schon weg (Timeout oder Gegenseite) – kein Fehler
        Err(SignalingError::AnrufNichtGefunden(_)) => return None,
        Err(e) => {
            tracing::debug!(call_id = %call_id, fehler = %e, "Ablehnung abgewiesen");
            return Some(ServerEvent::call_error(e.to_string()));
        }
    };

    abschluss_persistieren(call_id, AnrufStatus::Abgelehnt, state).await;

    session.anrufer_conn.senden(ServerEvent::CallRejected {
        call_id,
        by: identitaet.user_id,
    });
    None
}

/// Verarbeitet das Beenden eines Anrufs
pub async fn handle_end_call<R, V>(
    call_id: CallId,
    identitaet: &Identitaet,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    // Keine Session mehr: die Gegenseite hat bereits aufgelegt – no-op
    let Some(session) = state.anrufe.beenden(call_id, identitaet.user_id) else {
        return None;
    };

    abschluss_persistieren(call_id, AnrufStatus::Beendet, state).await;

    let gegenstelle = if session.anrufer == identitaet.user_id {
        &session.angerufener_conn
    } else {
        &session.anrufer_conn
    };
    gegenstelle.senden(ServerEvent::CallEnded { call_id });

    Some(ServerEvent::CallEnded { call_id })
}

/// Leitet einen WebRTC-Payload an die Gegenstelle weiter
///
/// Ohne lebende Session oder bei fremdem Absender wird das Signal still
/// verworfen – veraltete Signale nach Anrufende sind ein Normalfall.
pub fn handle_signal<R, V>(
    call_id: CallId,
    payload: SignalPayload,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    match state.anrufe.signal_ziel(&call_id, &ctx.conn_id) {
        Some(ziel) => {
            ziel.senden(ServerEvent::Signal { call_id, payload });
        }
        None => {
            tracing::trace!(call_id = %call_id, "Signal ohne lebende Session verworfen");
        }
    }
    None
}

/// Raeumt beim Verbindungsabbau alle Anrufe dieser Verbindung ab
///
/// Jede verbliebene Gegenstelle bekommt genau ein `call_ended`.
pub async fn verbindungs_sweep<R, V>(conn_id: &ConnectionId, state: &Arc<SignalingState<R, V>>)
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    for getrennt in state.anrufe.verbindung_trennen(conn_id) {
        getrennt
            .gegenstelle
            .senden(ServerEvent::CallEnded {
                call_id: getrennt.call_id,
            });
        abschluss_persistieren(getrennt.call_id, AnrufStatus::Beendet, state).await;
    }
}

/// Raeumt eine nach Ablauf der Klingelfrist noch klingelnde Session ab
async fn klingel_timeout<R, V>(call_id: CallId, state: &Arc<SignalingState<R, V>>)
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    let Some(session) = state.anrufe.klingel_timeout_pruefen(call_id) else {
        return;
    };

    session.anrufer_conn.senden(ServerEvent::CallEnded { call_id });
    session
        .angerufener_conn
        .senden(ServerEvent::CallEnded { call_id });

    abschluss_persistieren(call_id, AnrufStatus::Beendet, state).await;
}

/// Persistiert den terminalen Status eines Anrufs (best effort)
///
/// Die Session ist zu diesem Zeitpunkt bereits abgebaut; ein Fehlschlag
/// wird geloggt, aber nicht mehr an Clients gemeldet.
async fn abschluss_persistieren<R, V>(
    call_id: CallId,
    status: AnrufStatus,
    state: &Arc<SignalingState<R, V>>,
) where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    if let Err(e) = state
        .db
        .anruf_aktualisieren(call_id, AnrufUpdate::abgeschlossen(status, Utc::now()))
        .await
    {
        tracing::warn!(call_id = %call_id, fehler = %e, "Anruf-Abschluss nicht persistiert");
    }
}
