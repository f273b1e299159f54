//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 256 KB).

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::events::{ClientEvent, ServerEvent};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (256 KB – SDP-Bloecke bleiben weit darunter)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte Verbindungen
///
/// Generisch ueber Empfangs- (`In`) und Senderichtung (`Out`), damit Server
/// und Client denselben Codec-Typ mit vertauschten Rollen verwenden koennen.
pub struct FrameCodec<In, Out> {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
    _richtung: PhantomData<fn(Out) -> In>,
}

/// Codec aus Server-Sicht: dekodiert ClientEvents, kodiert ServerEvents
pub type ServerCodec = FrameCodec<ClientEvent, ServerEvent>;

/// Codec aus Client-Sicht: dekodiert ServerEvents, kodiert ClientEvents
pub type ClientCodec = FrameCodec<ServerEvent, ClientEvent>;

impl<In, Out> FrameCodec<In, Out> {
    /// Erstellt einen neuen Codec mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            _richtung: PhantomData,
        }
    }

    /// Erstellt einen Codec mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _richtung: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<In, Out> Default for FrameCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> Clone for FrameCodec<In, Out> {
    fn clone(&self) -> Self {
        Self {
            max_frame_size: self.max_frame_size,
            _richtung: PhantomData,
        }
    }
}

impl<In, Out> std::fmt::Debug for FrameCodec<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<In, Out> Decoder for FrameCodec<In, Out>
where
    In: DeserializeOwned,
{
    type Item = In;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        let event: In = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
            )
        })?;

        Ok(Some(event))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<In, Out> Encoder<Out> for FrameCodec<In, Out>
where
    Out: Serialize,
{
    type Error = io::Error;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Event zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ClientEvent;

    fn test_ping(timestamp_ms: u64) -> ClientEvent {
        ClientEvent::Ping { timestamp_ms }
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut server = ServerCodec::new();
        let mut client = ClientCodec::new();

        let mut buf = BytesMut::new();
        client.encode(test_ping(42), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = server
            .decode(&mut buf)
            .unwrap()
            .expect("Muss ein Event enthalten");
        assert!(matches!(decoded, ClientEvent::Ping { timestamp_ms: 42 }));
    }

    #[test]
    fn unvollstaendiger_frame_wartet_auf_daten() {
        let mut client = ClientCodec::new();
        let mut buf = BytesMut::new();
        client.encode(test_ping(1), &mut buf).unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        let mut server = ServerCodec::new();
        assert!(server.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn zu_wenig_bytes_fuer_laengenfeld() {
        let mut server = ServerCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(server.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn ablehnung_zu_grosser_frame_beim_decode() {
        let mut server = ServerCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        assert!(server.decode(&mut buf).is_err());
    }

    #[test]
    fn ablehnung_zu_grosses_event_beim_encode() {
        let mut client = ClientCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(client.encode(test_ping(1), &mut buf).is_err());
    }

    #[test]
    fn mehrere_events_im_buffer() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();
        let mut buf = BytesMut::new();

        for i in 0..3u64 {
            client.encode(test_ping(i), &mut buf).unwrap();
        }

        for i in 0..3u64 {
            let event = server.decode(&mut buf).unwrap().expect("Event erwartet");
            match event {
                ClientEvent::Ping { timestamp_ms } => assert_eq!(timestamp_ms, i),
                _ => panic!("Erwartet Ping"),
            }
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn ungueltiges_json_ist_io_fehler() {
        let mut server = ServerCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_slice(b"{{{{");
        assert!(server.decode(&mut buf).is_err());
    }
}
