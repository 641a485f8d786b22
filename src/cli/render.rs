use itertools::Itertools;

use crate::api::AnswerAck;
use crate::models::QuestionId;
use crate::tracker::{QuestionView, SessionSnapshot};

pub const REWARD_BANNER: &str = r#"
***********************************************
*   All questions answered. You did it!       *
*   Your prize is waiting at the finish line. *
***********************************************"#;

fn question(view: &QuestionView) -> String {
    let mut output = view.question.to_string();
    if view.answered {
        output += "\n\t[answered]";
    }
    for image in &view.images {
        output += &format!("\n\tPhoto by {}: {}", image.label, image.url);
    }

    output
}

pub fn questions(snapshot: &SessionSnapshot) -> String {
    if snapshot.questions.is_empty() {
        return String::from("No questions loaded.");
    }

    let mut output = snapshot.questions.iter().map(question).join("\n\n");
    if snapshot.all_answered {
        output += "\n\nEvery question is answered.";
    }

    output
}

pub fn status(snapshot: &SessionSnapshot) -> String {
    let Some(username) = &snapshot.username else {
        return String::from("Not logged in.");
    };

    let answered = snapshot.questions.iter().filter(|q| q.answered).count();
    let pending = snapshot.questions
        .iter()
        .filter(|q| !q.answered)
        .map(|q| format!("#{}", q.question.id))
        .join(", ");

    let mut output = format!("Logged in as {username}. Answered {answered} of {}.",
                             snapshot.questions.len());
    if !pending.is_empty() {
        output += &format!("\nStill open: {pending}");
    }

    output
}

pub fn answer_ack(id: QuestionId, ack: AnswerAck) -> String {
    match ack.correct {
        Some(true) => format!("Question {id}: correct!"),
        Some(false) => format!("Question {id}: not quite."),
        None => format!("Question {id}: answer recorded."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnsweredSet, Question, UploadedImage};

    fn view(id: QuestionId, answered: bool) -> QuestionView {
        QuestionView {
            question: Question {
                id,
                prompt: format!("Question {id}?"),
                options: Some(vec!["yes".into(), "no".into()]),
                requires_image: false,
                points: None,
            },
            answered,
            images: Vec::new(),
        }
    }

    #[test]
    fn status_lists_open_questions() {
        let snapshot = SessionSnapshot {
            username: Some("jas".into()),
            questions: vec![view(1, true), view(2, false), view(3, false)],
            answered: AnsweredSet::from_iter([1]),
            ..Default::default()
        };

        assert_eq!(status(&snapshot), "Logged in as jas. Answered 1 of 3.\nStill open: #2, #3");
        assert_eq!(status(&SessionSnapshot::default()), "Not logged in.");
    }

    #[test]
    fn question_shows_photos_with_labels() {
        let mut photo = view(9, true);
        photo.images.push(UploadedImage::from_filename("http://h/uploads", "diego_9.jpg"));

        let text = question(&photo);
        assert!(text.contains("[answered]"));
        assert!(text.contains("Photo by diego: http://h/uploads/diego_9.jpg"));
    }

    #[test]
    fn ack_wording() {
        assert_eq!(answer_ack(4, AnswerAck { correct: Some(true) }), "Question 4: correct!");
        assert_eq!(answer_ack(4, AnswerAck::default()), "Question 4: answer recorded.");
    }
}
