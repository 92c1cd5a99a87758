use tandem_core::Envelope;
use tandem_relay::RelayService;

use super::utils::{connect, offer_json, recv_text};

#[test]
fn envelope_is_delivered_verbatim_to_its_target_only() {
    let service = RelayService::new();
    let (_alice_conn, mut alice_rx) = connect(&service, "alice");
    let (_bob_conn, mut bob_rx) = connect(&service, "bob");
    let (_carol_conn, mut carol_rx) = connect(&service, "carol");

    let raw = offer_json("bob", "alice", "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n");
    service.forward(&raw);

    assert_eq!(recv_text(&mut bob_rx).as_deref(), Some(raw.as_str()));
    assert_eq!(recv_text(&mut alice_rx), None);
    assert_eq!(recv_text(&mut carol_rx), None);
}

#[test]
fn forwarding_preserves_the_original_bytes() {
    let service = RelayService::new();
    let (_conn, mut bob_rx) = connect(&service, "bob");

    // Odd spacing and field order must survive the hop untouched.
    let raw = r#"{ "data": {"type":"offer","sdp":"v=0"} , "from":"alice","type": "offer","target":"bob" }"#;
    service.forward(raw);

    assert_eq!(recv_text(&mut bob_rx).as_deref(), Some(raw));
}

#[test]
fn unknown_target_is_dropped_silently() {
    let service = RelayService::new();
    let (_conn, mut alice_rx) = connect(&service, "alice");

    service.forward(&offer_json("nobody", "alice", "v=0"));

    // No delivery failure notice comes back to the sender.
    assert_eq!(recv_text(&mut alice_rx), None);
}

#[test]
fn malformed_envelope_does_not_poison_the_hub() {
    let service = RelayService::new();
    let (_conn, mut bob_rx) = connect(&service, "bob");

    service.forward("{not json");
    service.forward(r#"{"type":"offer","target":"bob"}"#);
    service.forward(r#"{"type":"hangup","target":"bob","from":"alice","data":{}}"#);
    assert_eq!(recv_text(&mut bob_rx), None);

    let raw = offer_json("bob", "alice", "v=0");
    service.forward(&raw);
    assert_eq!(recv_text(&mut bob_rx).as_deref(), Some(raw.as_str()));
}

#[test]
fn sender_identity_is_not_validated() {
    // The hub routes on `target` alone; an unregistered sender can still
    // reach a registered participant.
    let service = RelayService::new();
    let (_conn, mut bob_rx) = connect(&service, "bob");

    let raw = offer_json("bob", "ghost", "v=0");
    service.forward(&raw);

    let delivered = recv_text(&mut bob_rx).unwrap();
    let envelope: Envelope = serde_json::from_str(&delivered).unwrap();
    assert_eq!(envelope.sender().as_str(), "ghost");
}

#[test]
fn dead_receiver_does_not_panic_the_hub() {
    let service = RelayService::new();
    let (_conn, bob_rx) = connect(&service, "bob");
    drop(bob_rx);

    service.forward(&offer_json("bob", "alice", "v=0"));

    // Still routable to live participants afterwards.
    let (_conn, mut carol_rx) = connect(&service, "carol");
    let raw = offer_json("carol", "alice", "v=0");
    service.forward(&raw);
    assert_eq!(recv_text(&mut carol_rx).as_deref(), Some(raw.as_str()));
}
