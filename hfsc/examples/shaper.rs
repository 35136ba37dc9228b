//! A three-class shaper fed with synthetic traffic.
//!
//! A voice class gets a real-time guarantee, a bulk class shares the link
//! proportionally but is capped by an upper limit, and a default class
//! catches everything unclassified.
//!
//! Run with: `cargo run --example shaper`

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use hfsc::{ClassConfig, HfscHandle, ServiceCurve};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = HfscHandle::attach(tx);

    handle.add_class(ClassConfig::new(0x1)).unwrap();
    // voice: 512 Kbit/s for the first 20 ms of a burst, 256 Kbit/s after
    handle
        .add_class(
            ClassConfig::new(0x10)
                .with_parent(0x1)
                .with_realtime(ServiceCurve::new(512_000, 20, 256_000))
                .with_linkshare(ServiceCurve::linear(256_000)),
        )
        .unwrap();
    // bulk: proportional share, capped at 1 Mbit/s
    handle
        .add_class(
            ClassConfig::new(0x11)
                .with_parent(0x1)
                .with_linkshare(ServiceCurve::linear(2_000_000))
                .with_upperlimit(ServiceCurve::linear(1_000_000)),
        )
        .unwrap();
    // catch-all for unclassified traffic
    handle
        .add_class(
            ClassConfig::new(0x12)
                .with_parent(0x1)
                .with_linkshare(ServiceCurve::linear(500_000))
                .with_default(true),
        )
        .unwrap();

    // sink: count what leaves the link
    let sink = tokio::spawn(async move {
        let mut delivered = 0u64;
        while rx.recv().await.is_some() {
            delivered += 1;
        }
        delivered
    });

    for i in 0..200u32 {
        let _ = handle.enqueue(0x10, Bytes::from(vec![0u8; 160]));
        let _ = handle.enqueue(0x11, Bytes::from(vec![0u8; 1400]));
        if i % 3 == 0 {
            // an unknown tag lands on the default class
            let _ = handle.enqueue(0xdead, Bytes::from(vec![0u8; 600]));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // let the shaper drain what its curves allow, then report
    tokio::time::sleep(Duration::from_millis(500)).await;
    for stats in handle.stats_dump() {
        tracing::info!(
            class = format_args!("{:#x}", stats.handle),
            xmit = stats.xmit_cnt.packets,
            dropped = stats.drop_cnt.packets,
            qlen = stats.qlen,
            "class stats"
        );
    }

    handle.detach();
    let delivered = sink.await.unwrap();
    tracing::info!(delivered, "shaper done");
}
