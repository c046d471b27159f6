mod common;

use common::photo;
use inspect_pipeline::agents::MediaIngestionAgent;
use inspect_pipeline::schemas::PhotoSubmission;

#[test]
fn keeps_valid_photos_in_order_with_metadata() {
    let agent = MediaIngestionAgent::new();
    let submitted = vec![
        PhotoSubmission {
            image_url: "https://cdn.example.com/a.jpg".into(),
            room_name: Some("Kitchen".into()),
            order_index: Some(2),
        },
        photo("not a url", Some("Garage")),
        photo("", None),
        PhotoSubmission {
            image_url: "http://10.0.0.4:9000/b.png?sig=abc".into(),
            room_name: None,
            order_index: Some(1),
        },
    ];
    let kept = agent.process("insp-1", &submitted);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].image_url, "https://cdn.example.com/a.jpg");
    assert_eq!(kept[0].room_name.as_deref(), Some("Kitchen"));
    assert_eq!(kept[0].order_index, Some(2));
    assert_eq!(kept[1].image_url, "http://10.0.0.4:9000/b.png?sig=abc");
    assert_eq!(kept[1].order_index, Some(1));
}

#[test]
fn ingestion_is_idempotent() {
    let agent = MediaIngestionAgent::new();
    let submitted = vec![
        photo("https://cdn.example.com/a.jpg", Some("Kitchen")),
        photo("http://localhost:3000/uploads/b.jpg", None),
        photo("cdn.example.com/missing-scheme.jpg", None),
    ];
    let first = agent.process("insp-1", &submitted);
    let resubmitted: Vec<PhotoSubmission> = first
        .iter()
        .map(|p| PhotoSubmission {
            image_url: p.image_url.clone(),
            room_name: p.room_name.clone(),
            order_index: p.order_index,
        })
        .collect();
    let second = agent.process("insp-1", &resubmitted);
    assert_eq!(first, second);
}

#[test]
fn missing_scheme_is_rejected() {
    let agent = MediaIngestionAgent::new();
    let kept = agent.process("insp-1", &[photo("www.example.com/a.jpg", None)]);
    assert!(kept.is_empty());
}
