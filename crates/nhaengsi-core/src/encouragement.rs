//! Encouragement messages shown next to a finished user poem.

use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Encouragement {
    pub icon: &'static str,
    pub headline: &'static str,
    pub detail: &'static str,
}

const fn msg(icon: &'static str, headline: &'static str, detail: &'static str) -> Encouragement {
    Encouragement {
        icon,
        headline,
        detail,
    }
}

pub const ENCOURAGEMENTS: [Encouragement; 10] = [
    msg("🌟✨", "와! 정말 창의적인 N행시예요!", "상상력이 넘쳐나는 멋진 작품이네요!"),
    msg("🎨🎭", "예술가처럼 아름다운 표현이에요!", "감성이 풍부한 시를 만들었어요!"),
    msg("🏆👑", "최고의 작품! 진짜 대단해요!", "이런 훌륭한 N행시는 처음 봐요!"),
    msg("💎🌈", "보석같이 빛나는 단어들이에요!", "무지개처럼 다채로운 표현력이 놀라워요!"),
    msg("🚀⭐", "우주로 날아갈 만큼 멋져요!", "별처럼 반짝이는 아이디어가 가득해요!"),
    msg("🎪🎊", "축제처럼 즐거운 N행시네요!", "파티가 열릴 만큼 신나는 작품이에요!"),
    msg("🌸🦋", "꽃처럼 아름다운 글이에요!", "나비처럼 우아하게 표현했네요!"),
    msg("🔥💫", "열정이 가득 담긴 작품이에요!", "번개처럼 번뜩이는 아이디어예요!"),
    msg("🎵🎶", "음악처럼 리듬감 있는 시네요!", "멜로디가 들리는 것 같아요!"),
    msg("🌙☀️", "달빛처럼 신비로운 표현이에요!", "햇살처럼 따뜻한 마음이 담겨있어요!"),
];

/// Table lookup; any index wraps around the table.
pub fn encouragement_at(index: usize) -> Encouragement {
    ENCOURAGEMENTS[index % ENCOURAGEMENTS.len()]
}

pub fn pick_encouragement<R: Rng + ?Sized>(rng: &mut R) -> Encouragement {
    encouragement_at(rng.random_range(0..ENCOURAGEMENTS.len()))
}
