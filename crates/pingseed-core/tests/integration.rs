//! Integration tests for pingseed-core.
//!
//! These drive the full pipeline with synthetic endpoints:
//! inbound event → listener → handoff queue → consumer → queue closure.

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use pingseed_core::{
    EndpointOpener, HostPlatform, IcmpEndpoint, IcmpServer, PeerAddress, ProtocolFamily,
    ReleaseError, Seed,
};

/// Endpoint whose inbound messages come from a test-controlled channel.
/// Dropping the feed sender makes the next read fail.
struct FeedEndpoint {
    feed: Receiver<String>,
}

impl IcmpEndpoint for FeedEndpoint {
    fn recv_peer(&mut self) -> io::Result<PeerAddress> {
        self.feed
            .recv()
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "feed closed"))
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Serves a feed for IPv4 and refuses IPv6.
struct V4FeedOpener {
    feed: Mutex<Option<Receiver<String>>>,
}

impl EndpointOpener for V4FeedOpener {
    fn open(&self, family: ProtocolFamily, _: IpAddr) -> io::Result<Box<dyn IcmpEndpoint>> {
        match family {
            ProtocolFamily::V4 => {
                let feed = self
                    .feed
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| io::Error::other("feed already taken"))?;
                Ok(Box::new(FeedEndpoint { feed }))
            }
            ProtocolFamily::V6 => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        }
    }
}

fn v4_feed_server() -> (IcmpServer, Receiver<Seed>, Sender<String>) {
    let (feed_tx, feed_rx) = crossbeam_channel::bounded(0);
    let (server, seeds) = IcmpServer::new();
    let server = server.with_platform(HostPlatform::Linux).with_opener(V4FeedOpener {
        feed: Mutex::new(Some(feed_rx)),
    });
    (server, seeds, feed_tx)
}

#[test]
fn both_families_unsupported_yields_immediate_end_of_stream() {
    let (server, seeds) = IcmpServer::new();
    let consumer = thread::spawn(move || seeds.iter().count());

    let report = server
        .with_platform(HostPlatform::from_os("plan9"))
        .run_dual_stack();

    assert_eq!(consumer.join().unwrap(), 0);
    assert_eq!(report.total_seeds(), 0);
    for family in ProtocolFamily::ALL {
        let outcome = report.outcome(family).unwrap();
        assert!(outcome.error.contains("not supported on plan9"));
    }
}

#[test]
fn one_family_failing_does_not_stop_the_other() {
    let (server, seeds, feed) = v4_feed_server();
    let consumer = thread::spawn(move || seeds.iter().collect::<Vec<Seed>>());
    let runner = thread::spawn(move || server.run_dual_stack());

    for peer in ["127.0.0.1", "10.1.2.3", "fe80::1"] {
        feed.send(peer.to_string()).unwrap();
    }
    // Closing the feed makes the IPv4 read fail; both listeners are now down.
    drop(feed);

    let report = runner.join().unwrap();
    let received = consumer.join().unwrap();

    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|s| (-1_000..1_000_000_000).contains(s)));

    let v4 = report.outcome(ProtocolFamily::V4).unwrap();
    assert_eq!(v4.seeds_delivered, 3);
    assert!(v4.error.contains("read failed"));

    let v6 = report.outcome(ProtocolFamily::V6).unwrap();
    assert_eq!(v6.seeds_delivered, 0);
    assert!(v6.error.contains("listen failed"));
}

#[test]
fn queue_closes_only_after_every_seed_was_taken() {
    let (server, seeds, feed) = v4_feed_server();
    let runner = thread::spawn(move || server.run_dual_stack());

    feed.send("192.0.2.1".to_string()).unwrap();
    drop(feed);

    // The listener is blocked handing over its seed; the queue is still open.
    let first = seeds.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!((-196..1_000_000_000).contains(&first));

    // Now both listeners stop and the orchestrator closes the queue.
    let report = runner.join().unwrap();
    assert_eq!(
        seeds.recv_timeout(Duration::from_millis(100)),
        Err(RecvTimeoutError::Disconnected)
    );
    assert_eq!(report.total_seeds(), 1);
}

#[test]
fn slow_consumer_throttles_the_listener() {
    let (server, seeds, feed) = v4_feed_server();
    let runner = thread::spawn(move || server.run_dual_stack());

    feed.send("10.0.0.1".to_string()).unwrap();
    // The listener is stuck pushing the first seed, so it cannot read again.
    assert!(matches!(
        feed.send_timeout("10.0.0.2".to_string(), Duration::from_millis(200)),
        Err(SendTimeoutError::Timeout(_))
    ));

    seeds.recv().unwrap();
    feed.send("10.0.0.2".to_string()).unwrap();
    seeds.recv().unwrap();

    drop(feed);
    let report = runner.join().unwrap();
    assert_eq!(report.total_seeds(), 2);
    assert!(seeds.recv().is_err());
}

#[test]
fn dropped_consumer_stops_producers_without_hanging() {
    let (server, seeds, feed) = v4_feed_server();
    drop(seeds);
    let runner = thread::spawn(move || server.run_dual_stack());

    feed.send("10.0.0.1".to_string()).unwrap();
    let report = runner.join().unwrap();

    let v4 = report.outcome(ProtocolFamily::V4).unwrap();
    assert_eq!(v4.seeds_delivered, 0);
    assert!(v4.error.contains("consumer disconnected"));
}

#[test]
fn release_failure_reaches_fatal_handler() {
    struct LeakyEndpoint;

    impl IcmpEndpoint for LeakyEndpoint {
        fn recv_peer(&mut self) -> io::Result<PeerAddress> {
            Err(io::Error::from(io::ErrorKind::UnexpectedEof))
        }

        fn close(self: Box<Self>) -> io::Result<()> {
            Err(io::Error::other("close failed"))
        }
    }

    struct LeakyOpener;

    impl EndpointOpener for LeakyOpener {
        fn open(&self, _: ProtocolFamily, _: IpAddr) -> io::Result<Box<dyn IcmpEndpoint>> {
            Ok(Box::new(LeakyEndpoint))
        }
    }

    let fatal_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fatal_seen);
    let (server, seeds) = IcmpServer::new();
    let report = server
        .with_platform(HostPlatform::Linux)
        .with_opener(LeakyOpener)
        .with_fatal_handler(Arc::new(move |err: &ReleaseError| {
            sink.lock().unwrap().push(err.family);
        }))
        .run_dual_stack();

    assert!(seeds.recv().is_err());
    assert_eq!(report.total_seeds(), 0);
    let mut families = fatal_seen.lock().unwrap().clone();
    families.sort_by_key(|f| f.to_string());
    assert_eq!(families, vec![ProtocolFamily::V4, ProtocolFamily::V6]);
}

#[test]
fn report_serializes_to_json() {
    let (server, _seeds) = IcmpServer::new();
    let report = server
        .with_platform(HostPlatform::from_os("windows"))
        .run_dual_stack();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["listeners"][0]["family"], "ipv4");
    assert_eq!(json["listeners"][1]["family"], "ipv6");
    assert_eq!(json["listeners"][0]["seeds_delivered"], 0);
    for listener in json["listeners"].as_array().unwrap() {
        assert!(listener["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}

#[test]
#[ignore] // Needs root / CAP_NET_RAW. Run with: sudo cargo test -- --ignored
fn raw_endpoints_probe_on_supported_platform() {
    let (server, _seeds) = IcmpServer::new();
    if !HostPlatform::current().is_supported() {
        return;
    }
    for family in ProtocolFamily::ALL {
        server.listener(family).probe().unwrap();
    }
}
