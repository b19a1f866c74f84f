//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use review_profiler::llm::{ChatRequest, LlmClient, LlmError, LlmResult};
use review_profiler::pipeline::InterruptHandle;

pub const PROFILE_JSON: &str =
    r#"{"summary": "Players enjoy it", "pros": ["art"], "cons": ["short"], "tags": ["cute"]}"#;

/// One scripted answer
pub enum Step {
    Reply(String),
    Fail(LlmError),
    /// Never answers; the oracle timeout has to cut it off
    Hang,
}

/// Scripted client: plays the script, then answers by request kind
///
/// Structured requests get [`PROFILE_JSON`], free-text requests get
/// "analysis N". Optionally triggers an interrupt after a given call.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ChatRequest>>,
    interrupt_after: Mutex<Option<(usize, InterruptHandle)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            interrupt_after: Mutex::new(None),
        }
    }

    pub fn with_script(self, steps: Vec<Step>) -> Self {
        *self.script.lock().unwrap() = steps.into();
        self
    }

    /// Trigger `handle` once `calls` requests have been answered
    pub fn interrupt_after(self, calls: usize, handle: InterruptHandle) -> Self {
        *self.interrupt_after.lock().unwrap() = Some((calls, handle));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.user_content().to_string())
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let step = self.script.lock().unwrap().pop_front();
        let answer = match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok("too late".to_string())
            }
            None if request.json_format => Ok(PROFILE_JSON.to_string()),
            None => Ok(format!("analysis {n}")),
        };

        if let Some((after, handle)) = self.interrupt_after.lock().unwrap().as_ref()
            && n >= *after
        {
            handle.trigger();
        }
        answer
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

/// Write a two-column review CSV with the default headers
pub fn write_reviews(dir: &Path, name: &str, rows: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(["游戏名称", "长评内容"]).unwrap();
    for (entity, text) in rows {
        writer.write_record([entity, text]).unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Write a two-column review workbook with the default headers
pub fn write_reviews_xlsx(dir: &Path, name: &str, rows: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "游戏名称").unwrap();
    sheet.write_string(0, 1, "长评内容").unwrap();
    for (i, (entity, text)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *entity).unwrap();
        sheet.write_string(row, 1, *text).unwrap();
    }
    workbook.save(&path).unwrap();
    path
}
