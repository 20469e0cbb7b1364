// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use serde_json::{json, Value};

// ==========================================
// Bagrut 请求构建器
// ==========================================

pub struct BagrutBuilder {
    student_id: String,
    teacher_id: String,
    program: Vec<Value>,
    presentations_completed: [bool; 4],
    magen_completed: bool,
    is_active: Option<bool>,
}

impl BagrutBuilder {
    pub fn new(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            teacher_id: "T1".to_string(),
            program: Vec::new(),
            presentations_completed: [false; 4],
            magen_completed: false,
            is_active: None,
        }
    }

    pub fn teacher(mut self, teacher_id: &str) -> Self {
        self.teacher_id = teacher_id.to_string();
        self
    }

    pub fn with_piece(mut self, title: &str, composer: &str) -> Self {
        self.program.push(json!({
            "title": title,
            "composer": composer,
            "duration": "6:30",
            "youtubeLink": "https://www.youtube.com/watch?v=abc123"
        }));
        self
    }

    /// 4 项阶段演奏与 magenBagrut 全部完成
    pub fn all_performed(mut self) -> Self {
        self.presentations_completed = [true; 4];
        self.magen_completed = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = Some(false);
        self
    }

    pub fn build(self) -> Value {
        let presentations: Vec<Value> = self
            .presentations_completed
            .iter()
            .map(|completed| {
                json!({
                    "completed": completed,
                    "status": if *completed { "passed" } else { "not-examined" }
                })
            })
            .collect();

        let mut doc = json!({
            "studentId": self.student_id,
            "teacherId": self.teacher_id,
            "program": self.program,
            "accompaniment": {
                "type": "soloist-accompanist",
                "accompanists": [
                    {"name": "Dana", "instrument": "piano", "phone": "0521234567"}
                ]
            },
            "presentations": presentations,
            "magenBagrut": {
                "completed": self.magen_completed,
                "status": if self.magen_completed { "passed" } else { "not-examined" }
            }
        });
        if let Some(is_active) = self.is_active {
            doc["isActive"] = json!(is_active);
        }
        doc
    }
}

// ==========================================
// 旧结构文档构建器（3 项阶段演奏）
// ==========================================

pub fn legacy_bagrut(id: &str, student_id: &str) -> Value {
    json!({
        "_id": id,
        "studentId": student_id,
        "teacherId": "T1",
        "program": [{"title": "Partita", "composer": "Bach", "duration": "8:00"}],
        "presentations": [
            {"completed": true, "status": "passed", "grade": 92, "gradeLevel": "טוב מאוד"},
            {"completed": true, "status": "passed", "grade": 80, "notes": "steady"},
            {"completed": false, "status": "not-examined"}
        ],
        "magenBagrut": {"completed": false, "status": "not-examined"},
        "isActive": true,
        "createdAt": "2023-05-01T10:00:00Z",
        "updatedAt": "2023-05-01T10:00:00Z"
    })
}
