use crate::models::question::QuestionType;
use rust_decimal::Decimal;

/// Tally of a user's selections for one choice question, against the
/// question's option set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceTally {
    pub selected_correct: u32,
    pub selected_wrong: u32,
    pub total_correct: u32,
}

/// Points earned for one question.
///
/// Single choice is all-or-nothing: exactly one selection and it must be the
/// correct one. Multiple choice gives proportional credit for the selected
/// correct options, but any wrong selection zeroes the question. The result
/// can be fractional; rounding happens only when progress is converted to a
/// percentage. Free text is recorded but not graded.
pub fn score_question(question_type: QuestionType, points: i32, tally: &ChoiceTally) -> Decimal {
    match question_type {
        QuestionType::Text => Decimal::ZERO,
        QuestionType::Single => {
            if tally.selected_correct == 1 && tally.selected_wrong == 0 {
                Decimal::from(points)
            } else {
                Decimal::ZERO
            }
        }
        QuestionType::Multiple => {
            if tally.selected_wrong > 0 || tally.total_correct == 0 {
                Decimal::ZERO
            } else {
                Decimal::from(points) * Decimal::from(tally.selected_correct)
                    / Decimal::from(tally.total_correct)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(selected_correct: u32, selected_wrong: u32, total_correct: u32) -> ChoiceTally {
        ChoiceTally {
            selected_correct,
            selected_wrong,
            total_correct,
        }
    }

    #[test]
    fn single_choice_exact_correct_selection_earns_full_points() {
        let score = score_question(QuestionType::Single, 5, &tally(1, 0, 1));
        assert_eq!(score, Decimal::from(5));
    }

    #[test]
    fn single_choice_correct_plus_wrong_earns_nothing() {
        let score = score_question(QuestionType::Single, 5, &tally(1, 1, 1));
        assert_eq!(score, Decimal::ZERO);
    }

    #[test]
    fn single_choice_only_wrong_earns_nothing() {
        let score = score_question(QuestionType::Single, 5, &tally(0, 1, 1));
        assert_eq!(score, Decimal::ZERO);
    }

    #[test]
    fn single_choice_no_selection_earns_nothing() {
        let score = score_question(QuestionType::Single, 5, &tally(0, 0, 1));
        assert_eq!(score, Decimal::ZERO);
    }

    #[test]
    fn multiple_choice_partial_credit_is_proportional() {
        // options {A correct, B correct, C wrong}, 10 points
        assert_eq!(
            score_question(QuestionType::Multiple, 10, &tally(1, 0, 2)),
            Decimal::from(5)
        );
        assert_eq!(
            score_question(QuestionType::Multiple, 10, &tally(2, 0, 2)),
            Decimal::from(10)
        );
        assert_eq!(
            score_question(QuestionType::Multiple, 10, &tally(1, 1, 2)),
            Decimal::ZERO
        );
        assert_eq!(
            score_question(QuestionType::Multiple, 10, &tally(0, 0, 2)),
            Decimal::ZERO
        );
    }

    #[test]
    fn multiple_choice_fraction_is_not_rounded() {
        let score = score_question(QuestionType::Multiple, 10, &tally(1, 0, 3));
        assert_eq!(score, Decimal::from(10) / Decimal::from(3));
    }

    #[test]
    fn multiple_choice_without_correct_options_earns_nothing() {
        let score = score_question(QuestionType::Multiple, 10, &tally(0, 0, 0));
        assert_eq!(score, Decimal::ZERO);
    }

    #[test]
    fn free_text_is_not_graded() {
        let score = score_question(QuestionType::Text, 7, &tally(0, 0, 0));
        assert_eq!(score, Decimal::ZERO);
    }
}
