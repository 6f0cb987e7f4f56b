//! End-to-end pipeline tests over on-disk JSON fixtures.
//!
//! The fixture corpus contains one flipped and one unflipped slice, so the
//! batch exercises the flip-induced disagreement between the two scoring
//! modes, the strict answer normalization, and the incomplete-run-set
//! handling, all through the public entry point.

use std::fs;
use std::path::Path;

use mirp_eval::{run_evaluation, EvalConfig, MarkerType, ScoringMode};

/// Canonical centers: patient-right structures at small x, patient-left at
/// large x (standard radiological orientation).
fn write_reference(path: &Path) {
    let reference = serde_json::json!([
        {"label_index": 2, "class_name": "kidney_right", "center_x": 160.0, "center_y": 200.0},
        {"label_index": 3, "class_name": "kidney_left",  "center_x": 340.0, "center_y": 200.0},
        {"label_index": 7, "class_name": "aorta",        "center_x": 270.0, "center_y": 150.0},
        {"label_index": 9, "class_name": "inferior_vena_cava", "center_x": 230.0, "center_y": 160.0},
    ]);
    fs::write(path, reference.to_string()).unwrap();
}

/// Two slices, three questions.
///
/// - `slice_flip.png` (A1, flipped): a lateral question whose image-view and
///   anatomy-view truths disagree (1 vs 0), plus a vertical question.
/// - `slice_plain.png` (B1, unflipped): a lateral question where both truths
///   agree (1).
fn write_dataset(path: &Path) {
    let dataset = serde_json::json!([
        {
            "filename": "slice_flip.png",
            "base_name": "amos_0001.nii",
            "slice_index": 31,
            "classes_count": 12,
            "multiple_components_same_label": false,
            "rotate_flip_short": "A1",
            "rotate_flip_long": "flipped, rotated 0 degrees",
            "question_answer": [
                {
                    "object1_name": "right kidney", "object1_gray": 2,
                    "object1_center_x": 100.0, "object1_center_y": 200.0,
                    "object2_name": "left kidney", "object2_gray": 3,
                    "object2_center_x": 200.0, "object2_center_y": 210.0,
                    "question": "Is the right kidney to the left of the left kidney?",
                    "answer": 1,
                },
                {
                    "object1_name": "aorta", "object1_gray": 7,
                    "object1_center_x": 250.0, "object1_center_y": 150.0,
                    "object2_name": "inferior vena cava", "object2_gray": 9,
                    "object2_center_x": 255.0, "object2_center_y": 300.0,
                    "question": "Is the aorta above the inferior vena cava?",
                    "answer": 1,
                },
            ],
        },
        {
            "filename": "slice_plain.png",
            "base_name": "amos_0002.nii",
            "slice_index": 18,
            "classes_count": 9,
            "multiple_components_same_label": true,
            "rotate_flip_short": "B1",
            "rotate_flip_long": "unflipped, rotated 0 degrees",
            "question_answer": [
                {
                    "object1_name": "left kidney", "object1_gray": 3,
                    "object1_center_x": 150.0, "object1_center_y": 220.0,
                    "object2_name": "right kidney", "object2_gray": 2,
                    "object2_center_x": 350.0, "object2_center_y": 225.0,
                    "question": "Is the left kidney to the left of the right kidney?",
                    "answer": 1,
                },
            ],
        },
    ]);
    fs::write(path, dataset.to_string()).unwrap();
}

fn write_run_file(path: &Path, q1: &str, q2: &str, q3: &str) {
    let answers = serde_json::json!([
        {
            "file_name": "slice_flip.png",
            "results_call": [
                {"question": "Is the right kidney to the left of the left kidney?",
                 "model_answer": q1, "expected_answer": 1, "entire_prompt": "..."},
                {"question": "Is the aorta above the inferior vena cava?",
                 "model_answer": q2, "expected_answer": 1, "entire_prompt": "..."},
            ],
        },
        {
            "file_name": "slice_plain.png",
            "results_call": [
                {"question": "Is the left kidney to the left of the right kidney?",
                 "model_answer": q3, "expected_answer": 1, "entire_prompt": "..."},
            ],
        },
    ]);
    fs::write(path, answers.to_string()).unwrap();
}

fn fixture_config(dir: &Path) -> EvalConfig {
    let dataset = dir.join("qa.json");
    let reference = dir.join("centers.json");
    let answers = dir.join("answers");
    fs::create_dir(&answers).unwrap();

    write_dataset(&dataset);
    write_reference(&reference);

    // run 0: compliant, everything as the image shows
    write_run_file(&answers.join("qa_dots_run_0.json"), "1", "1", "1");
    // run 1: anatomically correct on the flipped question
    write_run_file(&answers.join("qa_dots_run_1.json"), "0", "1", "1");
    // run 2: format breach plus a wrong lateral answer
    write_run_file(&answers.join("qa_dots_run_2.json"), "bogus", "1", "0");

    // a second experiment with a single run: incomplete by design
    write_run_file(&answers.join("qa_letters_run_0.json"), "1", "1", "1");

    let mut config = EvalConfig::new(dataset, reference, &answers);
    config.research_question = "RQ2".to_string();
    config.model = "gpt-4o".to_string();
    config.output = Some(dir.join("summary.csv"));
    config
}

#[test]
fn batch_scores_both_modes_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());

    let report = run_evaluation(&config).unwrap();

    assert_eq!(report.corpus.questions, 3);
    assert_eq!(report.corpus.flipped_slices, 1);
    assert_eq!(report.corpus.anatomy_evaluable, 2);
    assert_eq!(report.experiments.len(), 2);

    // --- qa_dots: complete run set ---
    let dots = &report.experiments[0];
    assert_eq!(dots.key.base, "qa_dots");
    assert_eq!(dots.key.marker, MarkerType::Dots);
    assert_eq!(dots.key.to_string(), "RQ2/dots/gpt-4o");

    // image view: run accuracies 3/3, 2/3, 1/3
    let image = dots.image.as_ref().unwrap();
    assert_eq!(image.mode, ScoringMode::ImageView);
    assert_eq!(image.run_count, 3);
    assert!((image.accuracy.mean - 2.0 / 3.0).abs() < 1e-9);

    // anatomy view: only the two lateral questions take part;
    // run accuracies 1/2, 2/2, 0/2
    let anatomy = dots.anatomy.as_ref().unwrap();
    assert_eq!(anatomy.mode, ScoringMode::AnatomyView);
    assert!((anatomy.accuracy.mean - 0.5).abs() < 1e-9);

    // the format breach is visible in run 2 of both modes
    let run2 = dots.image_runs.iter().find(|r| r.run_index == 2).unwrap();
    assert_eq!(run2.unparseable, 1);
    assert_eq!(run2.counts.correct(), 1);
    let run2_anatomy = dots.anatomy_runs.iter().find(|r| r.run_index == 2).unwrap();
    assert_eq!(run2_anatomy.unparseable, 1);
    assert_eq!(run2_anatomy.skipped_no_anatomy, 1);

    // --- qa_letters: one run instead of three ---
    let letters = &report.experiments[1];
    assert_eq!(letters.key.marker, MarkerType::Letters);
    assert!(letters.image.is_none());
    assert!(report.failures.iter().any(|f| f.contains("Incomplete run set")));
}

#[test]
fn flip_disagreement_separates_the_two_modes() {
    // A model that always reads the rendered image correctly: perfect in
    // image view, wrong on every flipped lateral question in anatomy view.
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config(dir.path());
    config.output = None;

    let answers = dir.path().join("answers");
    for run in 0..3 {
        write_run_file(&answers.join(format!("qa_dots_run_{run}.json")), "1", "1", "1");
    }

    let report = run_evaluation(&config).unwrap();
    let dots = &report.experiments[0];

    assert_eq!(dots.image.as_ref().unwrap().accuracy.mean, 1.0);
    // flipped lateral question wrong, unflipped one right
    assert_eq!(dots.anatomy.as_ref().unwrap().accuracy.mean, 0.5);
    assert_eq!(dots.image.as_ref().unwrap().accuracy.std_dev, 0.0);
}

#[test]
fn csv_summary_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());

    run_evaluation(&config).unwrap();

    let mut reader = csv::Reader::from_path(dir.path().join("summary.csv")).unwrap();
    let header = reader.headers().unwrap().clone();
    assert!(header.iter().any(|h| h == "image_accuracy_mean"));
    assert!(header.iter().any(|h| h == "anatomy_f1_std"));
    assert!(header.iter().any(|h| h == "image_unparseable_run2"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "RQ2");
    assert_eq!(&rows[0][2], "gpt-4o");
    // incomplete experiment leaves its aggregate columns empty
    assert_eq!(&rows[1][4], "");
}

#[test]
fn malformed_dataset_aborts_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());

    // corrupt the dataset: answer contradicting the recorded geometry
    let dataset = fs::read_to_string(&config.dataset).unwrap();
    fs::write(&config.dataset, dataset.replace("\"answer\":1", "\"answer\":0")).unwrap();

    let err = run_evaluation(&config).unwrap_err();
    assert!(matches!(err, mirp_eval::Error::MalformedDataset(_)));
}
