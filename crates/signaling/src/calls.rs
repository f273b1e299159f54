//! Anruf-Verwaltung – Zustandsmaschine fuer 1:1-Anrufe
//!
//! Haelt alle lebenden Anruf-Sessions im Speicher. Eine Session entsteht
//! beim Klingeln (Klingelt) und verschwindet bei Ablehnung, Beendigung,
//! Timeout oder Verbindungsabbau. Angenommene Anrufe bleiben als Relais-
//! Kontext fuer WebRTC-Signale bestehen.
//!
//! Alle Methoden sind rein synchron: kein Shard-Lock wird ueber einen
//! await-Punkt gehalten. Persistenz passiert ausserhalb, in den Handlern.

use crate::error::{SignalingError, SignalingResult};
use crate::presence::ClientSender;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tandem_core::types::{CallId, ConnectionId, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CallSession
// ---------------------------------------------------------------------------

/// Zustand eines lebenden Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Der Angerufene wurde benachrichtigt, hat aber noch nicht reagiert
    Klingelt,
    /// Beide Seiten sind im Gespraech, Signale werden relayt
    Angenommen,
}

/// Eine lebende Anruf-Session zwischen zwei Benutzern
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: CallId,
    pub anrufer: UserId,
    pub angerufener: UserId,
    /// Verbindung des Anrufers
    pub anrufer_conn: ClientSender,
    /// Verbindung des Angerufenen. Beim Klingeln die Verbindung die das
    /// Klingeln empfangen hat, nach Annahme die Verbindung des Annehmers.
    pub angerufener_conn: ClientSender,
    pub status: CallStatus,
    pub erstellt: Instant,
}

impl CallSession {
    /// Prueft ob ein Benutzer eine der beiden Parteien ist
    pub fn ist_partei(&self, user_id: &UserId) -> bool {
        self.anrufer == *user_id || self.angerufener == *user_id
    }
}

/// Ergebnis einer erfolgreichen Annahme
#[derive(Debug, Clone)]
pub struct AngenommenerAnruf {
    pub call_id: CallId,
    pub anrufer: UserId,
    pub angerufener: UserId,
    /// Verbindung des Anrufers, fuer die Benachrichtigung
    pub anrufer_conn: ClientSender,
}

/// Ein beim Verbindungsabbau abgeraeumter Anruf
#[derive(Debug, Clone)]
pub struct GetrennterAnruf {
    pub call_id: CallId,
    /// Verbindung der verbliebenen Gegenstelle
    pub gegenstelle: ClientSender,
}

// ---------------------------------------------------------------------------
// CallManager
// ---------------------------------------------------------------------------

/// Verwaltet alle lebenden Anruf-Sessions
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct CallManager {
    inner: Arc<CallManagerInner>,
}

struct CallManagerInner {
    /// Lebende Sessions, indiziert nach CallId
    anrufe: DashMap<CallId, CallSession>,
    /// Belegte Benutzer-Paare (ungeordnet) -> laufender Anruf
    ///
    /// Der Entry-Zugriff auf diese Map macht die Paar-Sperre atomar.
    paare: DashMap<(Uuid, Uuid), CallId>,
}

/// Ungeordneter Paar-Schluessel fuer die Belegt-Pruefung
fn paar_schluessel(a: &UserId, b: &UserId) -> (Uuid, Uuid) {
    if a.inner() <= b.inner() {
        (a.inner(), b.inner())
    } else {
        (b.inner(), a.inner())
    }
}

impl CallManager {
    /// Erstellt einen neuen CallManager
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(CallManagerInner {
                anrufe: DashMap::new(),
                paare: DashMap::new(),
            }),
        }
    }

    /// Prueft ob zwischen zwei Benutzern bereits ein Anruf laeuft
    pub fn paar_belegt(&self, a: &UserId, b: &UserId) -> bool {
        self.inner.paare.contains_key(&paar_schluessel(a, b))
    }

    /// Legt eine neue klingelnde Session an
    ///
    /// Schlaegt fehl wenn zwischen den beiden Benutzern bereits ein Anruf
    /// laeuft oder die Anrufer-Verbindung schon einen unbeantworteten
    /// Klingelversuch offen hat.
    pub fn anruf_erstellen(
        &self,
        call_id: CallId,
        anrufer_conn: ClientSender,
        angerufener_conn: ClientSender,
    ) -> SignalingResult<()> {
        let anrufer = anrufer_conn.user_id;
        let angerufener = angerufener_conn.user_id;

        if self.inner.anrufe.iter().any(|e| {
            e.value().status == CallStatus::Klingelt
                && e.value().anrufer_conn.conn_id == anrufer_conn.conn_id
        }) {
            return Err(SignalingError::AnrufBereitsAusgehend);
        }

        // Paar-Sperre atomar setzen
        match self.inner.paare.entry(paar_schluessel(&anrufer, &angerufener)) {
            Entry::Occupied(_) => return Err(SignalingError::PaarBelegt),
            Entry::Vacant(frei) => {
                frei.insert(call_id);
            }
        }

        let session = CallSession {
            call_id,
            anrufer,
            angerufener,
            anrufer_conn,
            angerufener_conn,
            status: CallStatus::Klingelt,
            erstellt: Instant::now(),
        };
        self.inner.anrufe.insert(call_id, session);

        tracing::info!(
            call_id = %call_id,
            anrufer = %anrufer,
            angerufener = %angerufener,
            "Anruf klingelt"
        );
        Ok(())
    }

    /// Nimmt einen klingelnden Anruf an
    ///
    /// Nur der Angerufene darf annehmen, und nur solange die Session
    /// klingelt. Bei konkurrierenden Annahmen gewinnt genau eine; alle
    /// weiteren scheitern an der Zustandspruefung. Die Verbindung des
    /// Annehmers wird als neue Angerufenen-Verbindung hinterlegt.
    pub fn annehmen(
        &self,
        call_id: CallId,
        wer: UserId,
        conn: ClientSender,
    ) -> SignalingResult<AngenommenerAnruf> {
        match self.inner.anrufe.entry(call_id) {
            Entry::Vacant(_) => Err(SignalingError::AnrufNichtGefunden(call_id.to_string())),
            Entry::Occupied(mut belegt) => {
                let session = belegt.get_mut();
                if session.status != CallStatus::Klingelt {
                    return Err(SignalingError::UngueltigerAnrufZustand(
                        "Anruf klingelt nicht mehr".into(),
                    ));
                }
                if session.angerufener != wer {
                    return Err(SignalingError::NichtBerechtigt(
                        "Nur der Angerufene kann annehmen".into(),
                    ));
                }
                session.status = CallStatus::Angenommen;
                session.angerufener_conn = conn;
                tracing::info!(call_id = %call_id, angerufener = %wer, "Anruf angenommen");
                Ok(AngenommenerAnruf {
                    call_id,
                    anrufer: session.anrufer,
                    angerufener: session.angerufener,
                    anrufer_conn: session.anrufer_conn.clone(),
                })
            }
        }
    }

    /// Lehnt einen klingelnden Anruf ab und entfernt die Session
    ///
    /// Nur fuer klingelnde Sessions gueltig, und nur durch eine der
    /// beiden Parteien.
    pub fn ablehnen(&self, call_id: CallId, wer: UserId) -> SignalingResult<CallSession> {
        match self.inner.anrufe.entry(call_id) {
            Entry::Vacant(_) => Err(SignalingError::AnrufNichtGefunden(call_id.to_string())),
            Entry::Occupied(belegt) => {
                let session = belegt.get();
                if session.status != CallStatus::Klingelt {
                    return Err(SignalingError::UngueltigerAnrufZustand(
                        "Nur klingelnde Anrufe koennen abgelehnt werden".into(),
                    ));
                }
                if !session.ist_partei(&wer) {
                    return Err(SignalingError::NichtBerechtigt(
                        "Absender ist keine Anruf-Partei".into(),
                    ));
                }
                let session = belegt.remove();
                self.paar_freigeben(&session);
                tracing::info!(call_id = %call_id, von = %wer, "Anruf abgelehnt");
                Ok(session)
            }
        }
    }

    /// Beendet einen Anruf und entfernt die Session
    ///
    /// Gueltig fuer klingelnde wie angenommene Sessions. Existiert keine
    /// Session (z.B. weil die Gegenseite gleichzeitig aufgelegt hat) oder
    /// ist der Absender keine Partei, passiert nichts.
    pub fn beenden(&self, call_id: CallId, wer: UserId) -> Option<CallSession> {
        match self.inner.anrufe.entry(call_id) {
            Entry::Vacant(_) => None,
            Entry::Occupied(belegt) => {
                if !belegt.get().ist_partei(&wer) {
                    tracing::debug!(call_id = %call_id, von = %wer, "Beenden durch Nicht-Partei verworfen");
                    return None;
                }
                let session = belegt.remove();
                self.paar_freigeben(&session);
                tracing::info!(call_id = %call_id, von = %wer, "Anruf beendet");
                Some(session)
            }
        }
    }

    /// Ermittelt das Relais-Ziel fuer ein WebRTC-Signal
    ///
    /// Gibt die Gegenstellen-Verbindung zurueck, sofern die Session lebt
    /// und die sendende Verbindung eine der beiden Session-Verbindungen
    /// ist. Andernfalls `None` – das Signal wird still verworfen.
    pub fn signal_ziel(&self, call_id: &CallId, von_conn: &ConnectionId) -> Option<ClientSender> {
        let session = self.inner.anrufe.get(call_id)?;
        if session.anrufer_conn.conn_id == *von_conn {
            Some(session.angerufener_conn.clone())
        } else if session.angerufener_conn.conn_id == *von_conn {
            Some(session.anrufer_conn.clone())
        } else {
            None
        }
    }

    /// Raeumt alle Sessions einer Verbindung ab (Verbindungsabbau)
    ///
    /// Der Abbau ist ueber die Verbindung gekeyt, nicht ueber den Benutzer:
    /// hat sich dieselbe Identitaet inzwischen neu verbunden und einen neuen
    /// Anruf gestartet, bleibt dieser unberuehrt. Gibt pro entfernter
    /// Session die verbliebene Gegenstelle zurueck, damit der Aufrufer sie
    /// benachrichtigen kann.
    pub fn verbindung_trennen(&self, conn_id: &ConnectionId) -> Vec<GetrennterAnruf> {
        let betroffen: Vec<CallId> = self
            .inner
            .anrufe
            .iter()
            .filter(|e| {
                e.value().anrufer_conn.conn_id == *conn_id
                    || e.value().angerufener_conn.conn_id == *conn_id
            })
            .map(|e| *e.key())
            .collect();

        let mut getrennt = Vec::with_capacity(betroffen.len());
        for call_id in betroffen {
            if let Some((_, session)) = self.inner.anrufe.remove(&call_id) {
                self.paar_freigeben(&session);
                let gegenstelle = if session.anrufer_conn.conn_id == *conn_id {
                    session.angerufener_conn.clone()
                } else {
                    session.anrufer_conn.clone()
                };
                tracing::info!(
                    call_id = %call_id,
                    gegenstelle = %gegenstelle.user_id,
                    "Anruf durch Verbindungsabbau beendet"
                );
                getrennt.push(GetrennterAnruf { call_id, gegenstelle });
            }
        }
        getrennt
    }

    /// Entfernt eine Session die nach Ablauf der Klingelfrist noch klingelt
    ///
    /// Wurde der Anruf inzwischen angenommen oder ist er bereits weg,
    /// passiert nichts.
    pub fn klingel_timeout_pruefen(&self, call_id: CallId) -> Option<CallSession> {
        match self.inner.anrufe.entry(call_id) {
            Entry::Vacant(_) => None,
            Entry::Occupied(belegt) => {
                if belegt.get().status != CallStatus::Klingelt {
                    return None;
                }
                let session = belegt.remove();
                self.paar_freigeben(&session);
                tracing::info!(call_id = %call_id, "Anruf nach Klingel-Timeout verworfen");
                Some(session)
            }
        }
    }

    /// Prueft ob eine Session lebt
    pub fn lebt(&self, call_id: &CallId) -> bool {
        self.inner.anrufe.contains_key(call_id)
    }

    /// Gibt die Anzahl lebender Sessions zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.anrufe.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn paar_freigeben(&self, session: &CallSession) {
        let schluessel = paar_schluessel(&session.anrufer, &session.angerufener);
        self.inner
            .paare
            .remove_if(&schluessel, |_, id| *id == session.call_id);
    }
}

impl Default for CallManager {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
