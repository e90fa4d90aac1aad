//! The model only picks an id; the cited poem always comes from this table.

use serde::Serialize;
use serde_json::{json, Value};

use crate::{EvaluationRecord, SAMPLE, SAMPLE_ID, TUNING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceTanka {
    pub id: u64,
    pub text: &'static str,
    pub author: &'static str,
    pub explanation: &'static str,
}

pub static REFERENCE_TANKA: [ReferenceTanka; 10] = [
    ReferenceTanka {
        id: 1,
        text: "東海の小島の磯の白砂にわれ泣きぬれて蟹とたはむる",
        author: "石川啄木",
        explanation: "故郷を離れた孤独と、自然の中での無垢な心が詠まれています。砂浜の白と海の青の対比が鮮やかです。",
    },
    ReferenceTanka {
        id: 2,
        text: "その子二十櫛にながるる黒髪のおごりの春のうつくしきかな",
        author: "与謝野晶子",
        explanation: "青春の生命力と自らの美しさへの自信が、流れる黒髪の描写を通して高らかに歌い上げられています。",
    },
    ReferenceTanka {
        id: 3,
        text: "観覧車回れよ回れ想ひ出は君には一日我には一生",
        author: "栗木京子",
        explanation: "同じ時間を共有していても、相手と自分とでその重みが異なる切なさを、回転する観覧車に託しています。",
    },
    ReferenceTanka {
        id: 4,
        text: "「嫁さんになれよ」だなんてカンタンに言わないでよと笑っちゃうけど",
        author: "俵万智",
        explanation: "口語体を活かした軽やかなリズムの中に、プロポーズされた瞬間の照れと喜びが素直に表現されています。",
    },
    ReferenceTanka {
        id: 5,
        text: "白鳥は哀しからずや空の青海のあをにも染まずただよふ",
        author: "若山牧水",
        explanation: "周囲の青さに染まることなく孤独に漂う白鳥に、作者自身の孤独な魂を重ね合わせています。",
    },
    ReferenceTanka {
        id: 6,
        text: "春の夜の夢ばかりなる手枕にかひなく立たむ名こそ惜しけれ",
        author: "周防内侍",
        explanation: "平安時代の恋の駆け引きを詠んだ歌ですが、一瞬の夢のような出来事に身を委ねることの危うさを説いています。",
    },
    ReferenceTanka {
        id: 7,
        text: "不来方のお城の草に寝ころびて空に吸はれし十五の心",
        author: "石川啄木",
        explanation: "青春時代の無垢で吸収性の高い心が、広い空に溶け込んでいくような感覚を瑞々しく描いています。",
    },
    ReferenceTanka {
        id: 8,
        text: "たのしみは妻子むつまじくうちつどひ頭ならべて物をくふ時",
        author: "橘曙覧",
        explanation: "「独楽吟」の中の一首。日常のささやかな幸せこそが人生の楽しみであるという実感が込められています。",
    },
    ReferenceTanka {
        id: 9,
        text: "死にたくてならぬ時あり箸持てば大根のあたまの欠けてゐるにも",
        author: "斎藤茂吉",
        explanation: "日常の些細な欠損（大根の欠け）から、ふと死にたいほどの虚無感や寂しさが誘発される心理を鋭く捉えています。",
    },
    ReferenceTanka {
        id: 10,
        text: "くれなゐの二尺伸びたる薔薇の芽の針やはらかに春雨のふる",
        author: "正岡子規",
        explanation: "病床から眺める庭の景色。薔薇の芽の赤さと柔らかい針、そして春雨の静けさが、生命の息吹を感じさせます。",
    },
];

fn requested_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve a requested id to a table entry. Zero, absent and unreadable ids
/// take the default; ids past the end wrap around.
pub fn resolve_sample(id: Option<u64>) -> &'static ReferenceTanka {
    let len = REFERENCE_TANKA.len() as u64;
    let id = match id {
        Some(id) if id > 0 => ((id - 1) % len) + 1,
        _ => TUNING.default_sample_id,
    };
    &REFERENCE_TANKA[(id - 1) as usize]
}

/// Replace `sample` with the table entry chosen by `sampleId`.
pub fn attach_reference_sample(record: &mut EvaluationRecord) -> &'static ReferenceTanka {
    let chosen = resolve_sample(requested_id(record.get(SAMPLE_ID)));
    record.fields_mut().insert(
        SAMPLE.to_string(),
        json!({
            "text": chosen.text,
            "author": chosen.author,
            "explanation": chosen.explanation,
        }),
    );
    chosen
}
