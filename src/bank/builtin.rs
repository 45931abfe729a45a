use super::{Question, QuestionBank, Section};

fn section(name: &str, questions: Vec<Question>) -> Section {
    Section {
        name: name.to_string(),
        questions,
    }
}

/// The bank used when no `question_bank_path` is configured.
pub fn builtin_bank() -> QuestionBank {
    let sections = vec![
        section(
            "Aptitude",
            vec![
                Question::new("If 3x + 2 = 11, what is x?", ["2", "3", "9", "11"], 1),
                Question::new("What is 15% of 200?", ["20", "30", "25", "35"], 1),
                Question::new(
                    "If train A runs at 60 km/hr and B at 40 km/hr, ratio speed A:B?",
                    ["3:2", "2:3", "6:4", "4:3"],
                    0,
                ),
                Question::new("What is the LCM of 6 and 8?", ["24", "48", "12", "18"], 0),
                Question::new("Solve: 7 * 8 - 5", ["51", "56", "45", "50"], 0),
            ],
        ),
        section(
            "Reasoning",
            vec![
                Question::new("Find the next: 2, 4, 8, 16, ?", ["20", "24", "32", "18"], 2),
                Question::new("If ALL = 3 letters, then BALL = ?", ["4", "5", "3", "2"], 0),
                Question::new(
                    "Which does not belong: Dog, Cat, Car, Cow?",
                    ["Dog", "Cat", "Car", "Cow"],
                    2,
                ),
                Question::new("If A=1, B=2 then Z=?", ["26", "25", "27", "24"], 0),
                Question::new(
                    "Which is opposite of 'ascend'?",
                    ["Rise", "Drop", "Climb", "Descend"],
                    3,
                ),
            ],
        ),
        section(
            "Coding",
            vec![
                Question::new(
                    "Which language uses 'def' to define a function?",
                    ["Java", "C++", "Python", "Ruby"],
                    2,
                ),
                Question::new(
                    "What does HTML stand for?",
                    [
                        "Hyperlink Text Markup Language",
                        "HyperText Markup Language",
                        "Home Tool Markup Language",
                        "HyperText Makeup Language",
                    ],
                    1,
                ),
                Question::new(
                    "Which symbol starts a single-line comment in Java?",
                    ["//", "/*", "#", "<!--"],
                    0,
                ),
                Question::new(
                    "Which keyword is used to create a class in Java?",
                    ["func", "class", "def", "new"],
                    1,
                ),
                Question::new(
                    "What is the output of: print(2+3*4) in Python?",
                    ["20", "14", "10", "24"],
                    1,
                ),
            ],
        ),
    ];

    QuestionBank { sections }
}
