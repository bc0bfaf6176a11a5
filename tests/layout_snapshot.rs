use text_overlay_rust::overlay::{anchor_position, clamp_to_image, wrap_text, Position};

fn char_width(text: &str) -> f32 {
    text.chars().count() as f32 * 10.0
}

#[test]
fn anchor_positions_snapshot() {
    let image = (800, 600);
    let block = (100, 50);
    let mut out = String::new();
    for position in Position::ALL {
        let (x, y) = anchor_position(position, image, block, (0, 0));
        out.push_str(&format!("{}: {},{}\n", position, x, y));
    }
    insta::assert_snapshot!(out, @r"
    center: 350,275
    top: 350,20
    bottom: 350,530
    left: 20,275
    right: 680,275
    top-left: 20,20
    top-right: 680,20
    bottom-left: 20,530
    bottom-right: 680,530
    ");
}

#[test]
fn anchor_positions_are_distinct() {
    let mut seen: Vec<(i64, i64)> = Position::ALL
        .iter()
        .map(|position| anchor_position(*position, (800, 600), (100, 50), (0, 0)))
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), Position::ALL.len());
}

#[test]
fn offsets_are_clamped_back_inside() {
    let anchored = anchor_position(Position::BottomRight, (800, 600), (100, 50), (500, 500));
    assert_eq!(clamp_to_image(anchored, (100, 50), (800, 600), 20), (680, 530));
    let anchored = anchor_position(Position::TopLeft, (800, 600), (100, 50), (-500, -500));
    assert_eq!(clamp_to_image(anchored, (100, 50), (800, 600), 20), (20, 20));
}

#[test]
fn wrap_snapshot() {
    let lines = wrap_text(
        "the quick brown fox jumps over the lazy dog\n\nsupercalifragilistic end",
        100.0,
        char_width,
    );
    insta::assert_snapshot!(lines.join("|"), @"the quick|brown fox|jumps over|the lazy|dog||supercalifragilistic|end");
}
