//! Routes recognized speech to an app feature.
//!
//! Matching is plain keyword containment, checked in a fixed order. Taxi
//! comes first and also claims any sentence containing 去 or 到, so "到医院
//! 挂号" is a taxi request, not a registration.

use common::Error;
use regex::Regex;
use serde::Serialize;

const TAXI_WORDS: &[&str] = &["打车", "叫车", "出租车", "去", "到"];
const COMMON_PLACES: &[&str] = &[
    "医院", "超市", "银行", "公园", "车站", "机场", "商场", "学校", "大学",
];
const PAYMENT_WORDS: &[&str] = &["缴费", "交费", "电费", "水费", "网费"];
const HOSPITAL_WORDS: &[&str] = &["挂号", "看病", "医院", "预约"];
const CHAT_WORDS: &[&str] = &["聊天", "说话", "问答"];
const EMERGENCY_WORDS: &[&str] = &["呼救", "救命", "紧急", "帮助"];
const SETTINGS_WORDS: &[&str] = &["设置", "调整"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Taxi { destination: Option<String> },
    Payment,
    Hospital,
    Chat,
    Emergency,
    Settings,
    Unknown,
}

pub struct CommandInterpreter {
    destination_re: Regex,
}

impl CommandInterpreter {
    pub fn new() -> Result<Self, Error> {
        let destination_re = Regex::new(r"(去|到|前往)(.{2,})")
            .map_err(|e| Error::Other(format!("bad destination pattern: {e}")))?;
        Ok(Self { destination_re })
    }

    pub fn interpret(&self, text: &str) -> Command {
        let command = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| command.contains(w));

        let destination_match = self
            .destination_re
            .captures(text)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim().to_string());

        if has(TAXI_WORDS) || destination_match.is_some() {
            let destination = destination_match.filter(|d| !d.is_empty()).or_else(|| {
                COMMON_PLACES
                    .iter()
                    .find(|p| command.contains(*p))
                    .map(|p| p.to_string())
            });
            return Command::Taxi { destination };
        }
        if has(PAYMENT_WORDS) {
            return Command::Payment;
        }
        if has(HOSPITAL_WORDS) {
            return Command::Hospital;
        }
        if has(CHAT_WORDS) {
            return Command::Chat;
        }
        if has(EMERGENCY_WORDS) {
            return Command::Emergency;
        }
        if has(SETTINGS_WORDS) {
            return Command::Settings;
        }
        Command::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Department {
    #[serde(rename = "内科")]
    InternalMedicine,
    #[serde(rename = "外科")]
    Surgery,
    #[serde(rename = "眼科")]
    Ophthalmology,
    #[serde(rename = "中医科")]
    TraditionalChinese,
    #[serde(rename = "牙科")]
    Dental,
    #[serde(rename = "皮肤科")]
    Dermatology,
}

impl Department {
    pub const fn label(self) -> &'static str {
        match self {
            Department::InternalMedicine => "内科",
            Department::Surgery => "外科",
            Department::Ophthalmology => "眼科",
            Department::TraditionalChinese => "中医科",
            Department::Dental => "牙科",
            Department::Dermatology => "皮肤科",
        }
    }
}

// Checked top to bottom; the first keyword hit wins.
const DEPARTMENT_KEYWORDS: &[(Department, &[&str])] = &[
    (
        Department::InternalMedicine,
        &[
            "内科", "感冒", "发烧", "咳嗽", "肚子", "腹痛", "腹泻", "心脏", "高血压", "糖尿病",
            "头痛", "胃", "胃痛",
        ],
    ),
    (
        Department::Surgery,
        &["外科", "骨折", "外伤", "伤口", "手术", "摔伤", "骨", "骨头", "扭伤"],
    ),
    (
        Department::Ophthalmology,
        &["眼科", "眼睛", "视力", "看不清", "眼痛", "眼", "近视", "远视", "散光"],
    ),
    (
        Department::TraditionalChinese,
        &["中医", "中医科", "调理", "针灸", "拔罐", "推拿", "按摩", "理疗"],
    ),
    (
        Department::Dental,
        &["牙科", "牙", "牙齿", "牙痛", "口腔", "拔牙", "补牙", "牙龈", "蛀牙"],
    ),
    (
        Department::Dermatology,
        &["皮肤科", "皮肤", "过敏", "痒", "红疹", "湿疹", "痘", "痘痘", "青春痘"],
    ),
];

/// Map a symptom description to a department.
pub fn match_department(text: &str) -> Option<Department> {
    DEPARTMENT_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(dept, _)| *dept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(text: &str) -> Command {
        CommandInterpreter::new().unwrap().interpret(text)
    }

    fn taxi(dest: &str) -> Command {
        Command::Taxi {
            destination: Some(dest.to_string()),
        }
    }

    #[test]
    fn test_destination_extracted() {
        assert_eq!(interpret("我要去福建省立医院"), taxi("福建省立医院"));
        assert_eq!(interpret("帮我打车前往火车站南广场"), taxi("火车站南广场"));
    }

    #[test]
    fn test_taxi_without_destination() {
        assert_eq!(interpret("我要打车"), Command::Taxi { destination: None });
    }

    #[test]
    fn test_common_place_when_pattern_too_short() {
        // "到" followed by one char does not satisfy the two-char capture.
        assert_eq!(interpret("叫车银行到"), taxi("银行"));
    }

    #[test]
    fn test_taxi_wins_over_hospital() {
        assert_eq!(interpret("到医院挂号"), taxi("医院挂号"));
    }

    #[test]
    fn test_other_commands_in_order() {
        assert_eq!(interpret("交电费"), Command::Payment);
        assert_eq!(interpret("我想挂号看病"), Command::Hospital);
        assert_eq!(interpret("陪我聊天"), Command::Chat);
        assert_eq!(interpret("救命啊"), Command::Emergency);
        assert_eq!(interpret("调整字体"), Command::Settings);
        assert_eq!(interpret("今天天气怎么样"), Command::Unknown);
    }

    #[test]
    fn test_payment_before_emergency() {
        assert_eq!(interpret("帮助我缴费"), Command::Payment);
    }

    #[test]
    fn test_match_department() {
        assert_eq!(match_department("我发烧了"), Some(Department::InternalMedicine));
        assert_eq!(match_department("摔伤了腿"), Some(Department::Surgery));
        assert_eq!(match_department("看不清东西"), Some(Department::Ophthalmology));
        assert_eq!(match_department("想做针灸"), Some(Department::TraditionalChinese));
        assert_eq!(match_department("牙龈出血"), Some(Department::Dental));
        assert_eq!(match_department("身上很痒"), Some(Department::Dermatology));
        assert_eq!(match_department("不舒服"), None);
    }

    #[test]
    fn test_department_priority() {
        // "胃" (internal) is listed before "眼" (ophthalmology).
        assert_eq!(match_department("胃和眼睛都难受"), Some(Department::InternalMedicine));
    }
}
