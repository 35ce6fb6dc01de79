use crate::schema::FieldDescriptor;
use crate::settings::{CustomPrompt, FixedFieldsEnabled, Language, Settings};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInjection {
    Set(String),
    Clear,
}

struct Template {
    header: &'static [&'static str],
    time: (&'static str, &'static str),
    place: (&'static str, &'static str),
    weather: (&'static str, &'static str),
    news: &'static str,
    news_title: (&'static str, &'static str),
    news_content: (&'static str, &'static str),
}

const ZH_TW: Template = Template {
    header: &["狀態欄:", "在 所有文字 結束之後必須生成以下代碼塊(含)狀態欄:", "**與上一輪不允許相同**"],
    time: ("時間", "當前時間, 格式為 yyyy年MM月dd日．星期．HH時mm分"),
    place: ("地點", "當前劇情地點, 格式為 地點層1．地點層2"),
    weather: ("天氣", "當前劇情天日或環境溫度, 格式為 文雅形容天氣光線．溫度．天氣"),
    news: "新聞",
    news_title: (
        "標題",
        "當前電視上可能播放的新聞標題。可以是社會新聞、研究新聞、科普新聞, 需與劇情或者人物相關。帶點幽默微搞笑。",
    ),
    news_content: ("內文", "這則新聞的內文,以新聞語氣100字以內播報。"),
};

const EN: Template = Template {
    header: &[
        "Status block:",
        "After all other text, you must output the following code block (fences included):",
        "**Values must not repeat the previous turn**",
    ],
    time: ("time", "current time, formatted as yyyy-MM-dd, weekday, HH:mm"),
    place: ("place", "current scene location, formatted as area, spot"),
    weather: ("weather", "current weather or temperature, formatted as light, temperature, conditions"),
    news: "news",
    news_title: (
        "title",
        "a headline that could be on TV right now, related to the story or characters, a little humorous",
    ),
    news_content: ("content", "the body of that news item, in a newscaster's tone, under 100 words"),
};

fn template(language: Language) -> &'static Template {
    match language {
        Language::ZhTw => &ZH_TW,
        Language::En => &EN,
    }
}

fn describe(custom: Option<&Option<String>>, fallback: &str) -> String {
    match custom.and_then(|value| value.as_deref()) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

pub fn generate_status_prompt(
    fields: &[FieldDescriptor],
    language: Language,
    fixed: &FixedFieldsEnabled,
    custom: Option<&CustomPrompt>,
    marker: &str,
) -> String {
    let t = template(language);
    let mut lines: Vec<String> = t.header.iter().map(|line| line.to_string()).collect();
    lines.push(format!("```{marker}"));

    if fixed.time {
        let desc = describe(custom.map(|c| &c.time), t.time.1);
        lines.push(format!("{}: ${{{desc}}}", t.time.0));
    }
    if fixed.place {
        let desc = describe(custom.map(|c| &c.place), t.place.1);
        lines.push(format!("{}: ${{{desc}}}", t.place.0));
    }
    if fixed.weather {
        let desc = describe(custom.map(|c| &c.weather), t.weather.1);
        lines.push(format!("{}: ${{{desc}}}", t.weather.0));
    }
    if fixed.news {
        lines.push(format!("{}:", t.news));
        let title = describe(custom.map(|c| &c.news_title), t.news_title.1);
        lines.push(format!("  {}: ${{{title}}}", t.news_title.0));
        let content = describe(custom.map(|c| &c.news_content), t.news_content.1);
        lines.push(format!("  {}: ${{{content}}}", t.news_content.0));
    }

    let mut dynamic: Vec<&FieldDescriptor> = fields.iter().filter(|field| field.enabled).collect();
    dynamic.sort_by_key(|field| field.order);
    for field in dynamic {
        let desc = if field.description.trim().is_empty() {
            match language {
                Language::ZhTw => format!("{}的值", field.name),
                Language::En => format!("value of {}", field.name),
            }
        } else {
            field.description.clone()
        };
        lines.push(format!("{}: ${{{desc}}}", field.name));
    }

    lines.push("```".to_string());
    lines.join("\n")
}

/// What to inject when generation starts, given the current settings.
pub fn prompt_injection(settings: &Settings) -> PromptInjection {
    if !settings.panel_enabled {
        debug!("prompt injection disabled, clearing");
        return PromptInjection::Clear;
    }
    let prompt = generate_status_prompt(
        &settings.fields,
        settings.language,
        &settings.fixed_fields_enabled,
        settings.custom_prompt.as_ref(),
        &settings.marker,
    );
    debug!(fields = settings.fields.len(), chars = prompt.len(), "injecting status prompt");
    PromptInjection::Set(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn field(name: &str, description: &str, order: i64, enabled: bool) -> FieldDescriptor {
        FieldDescriptor {
            id: format!("id-{name}"),
            name: name.to_string(),
            description: description.to_string(),
            order,
            enabled,
            field_type: FieldType::Number,
        }
    }

    #[test]
    fn full_zh_prompt() {
        let fields = [field("好感度", "0到100", 0, true), field("秘密", "", 1, true)];
        let prompt = generate_status_prompt(&fields, Language::ZhTw, &FixedFieldsEnabled::default(), None, "myst");
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[3], "```myst");
        assert!(lines[4].starts_with("時間: ${當前時間"));
        assert_eq!(lines[7], "新聞:");
        assert!(lines[8].starts_with("  標題: ${"));
        assert_eq!(lines[10], "好感度: ${0到100}");
        assert_eq!(lines[11], "秘密: ${秘密的值}");
        assert_eq!(lines[12], "```");
    }

    #[test]
    fn disabled_fixed_and_dynamic_fields_are_left_out() {
        let fixed = FixedFieldsEnabled {
            time: false,
            place: true,
            weather: false,
            news: false,
        };
        let fields = [field("b", "", 2, true), field("off", "", 0, false), field("a", "", 1, true)];
        let prompt = generate_status_prompt(&fields, Language::En, &fixed, None, "mingyu");
        let body: Vec<&str> = prompt.lines().skip(3).collect();
        assert_eq!(
            body,
            vec![
                "```mingyu",
                "place: ${current scene location, formatted as area, spot}",
                "a: ${value of a}",
                "b: ${value of b}",
                "```",
            ]
        );
    }

    #[test]
    fn custom_descriptions_override_defaults() {
        let custom = CustomPrompt {
            weather: Some("晴雨".into()),
            place: Some("   ".into()),
            ..CustomPrompt::default()
        };
        let prompt =
            generate_status_prompt(&[], Language::ZhTw, &FixedFieldsEnabled::default(), Some(&custom), "myst");
        assert!(prompt.contains("天氣: ${晴雨}"));
        assert!(prompt.contains("地點: ${當前劇情地點"));
    }

    #[test]
    fn injection_follows_panel_toggle() {
        let mut settings = Settings::default();
        assert_eq!(prompt_injection(&settings), PromptInjection::Clear);

        settings.panel_enabled = true;
        match prompt_injection(&settings) {
            PromptInjection::Set(text) => assert!(text.contains("好感度: ${")),
            PromptInjection::Clear => panic!("expected a prompt"),
        }
    }
}
