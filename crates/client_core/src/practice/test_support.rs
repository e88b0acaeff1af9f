use shared::{domain::SignId, protocol::SignSummary};

pub(crate) fn practice_signs(count: usize) -> Vec<SignSummary> {
    (0..count)
        .map(|i| SignSummary {
            sign_id: SignId(i as i64),
            text: format!("sign-{i}"),
            video_url: format!("https://cdn.example/practice/{i}.mp4"),
            thumbnail_url: None,
            difficulty_level: None,
        })
        .collect()
}
