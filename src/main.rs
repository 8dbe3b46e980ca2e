//! Lingua Tutor - conversational language practice in the terminal

use anyhow::{Context, Result};
use clap::Parser;
use lingua_tutor::config::{self, Config, Language};
use lingua_tutor::core::{self as models, ChatModel};
use lingua_tutor::error::{TutorError, TutorResult};
use lingua_tutor::lessons::{Lesson, LessonManager};
use lingua_tutor::model::{Difficulty, LessonKind};
use lingua_tutor::progress::ProgressStore;
use lingua_tutor::speech::{self, SpeechEngine};
use lingua_tutor::tutor::{LearningContext, LessonSummary, Tutor, TutorReply};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RULE: &str = "==================================================";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Practice language, by name or code (e.g. "Spanish" or "es")
    #[arg(short, long)]
    language: Option<String>,
}

/// Interactive terminal front end
struct App {
    config: Config,
    lessons: LessonManager,
    store: ProgressStore,
    model: Arc<dyn ChatModel>,
    speech: Option<Arc<dyn SpeechEngine>>,
    language: Option<Language>,
    input: Lines<BufReader<Stdin>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load_config().context("invalid configuration")?;

    // Logs go to stderr so the conversation keeps stdout
    let level = if args.debug || config.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "🎓 Lingua Tutor v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let language = match args.language.as_deref() {
        Some(wanted) => Some(
            config
                .language(wanted)
                .cloned()
                .with_context(|| format!("unsupported language '{wanted}'"))?,
        ),
        None => None,
    };

    let lessons = LessonManager::open(config.lessons_dir())?;
    let store = ProgressStore::open(config.db_path())?;
    let model = models::create_model(&config);
    let speech = speech::create_engine(&config);

    let mut app = App {
        config,
        lessons,
        store,
        model,
        speech,
        language,
        input: BufReader::new(tokio::io::stdin()).lines(),
    };
    app.run().await
}

impl App {
    async fn run(&mut self) -> Result<()> {
        println!("🎓 Welcome to Lingua Tutor!");
        println!("{}", &RULE[..40]);

        loop {
            println!("\nWhat would you like to do?");
            println!("1. Start a new lesson");
            println!("2. View progress");
            println!("3. Quit");

            let Some(choice) = self.prompt("\nEnter your choice (1-3): ").await? else {
                break;
            };
            match choice.as_str() {
                "1" => self.lesson().await?,
                "2" => self.show_progress(),
                "3" => break,
                _ => println!("Invalid choice. Please try again."),
            }
        }

        println!("\n👋 Goodbye! Keep practicing!");
        Ok(())
    }

    /// Print a prompt and read one trimmed line, `None` on end of input
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        print!("{text}");
        std::io::stdout().flush()?;
        Ok(self
            .input
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    /// Numbered menu, returns the chosen index
    async fn choose(&mut self, title: &str, options: &[String]) -> Result<Option<usize>> {
        println!("\n{title}:");
        for (i, option) in options.iter().enumerate() {
            println!("{}. {}", i + 1, option);
        }
        loop {
            let Some(answer) = self.prompt("\nSelect (number): ").await? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => println!("Please enter a number between 1 and {}.", options.len()),
            }
        }
    }

    async fn lesson(&mut self) -> Result<()> {
        let language = match self.language.clone() {
            Some(language) => language,
            None => {
                let names: Vec<String> =
                    self.config.languages.iter().map(|l| l.name.clone()).collect();
                let Some(i) = self.choose("Available languages", &names).await? else {
                    return Ok(());
                };
                self.config.languages[i].clone()
            }
        };

        let levels: Vec<String> = Difficulty::ALL.iter().map(|d| d.label().to_string()).collect();
        let Some(i) = self.choose("Difficulty levels", &levels).await? else {
            return Ok(());
        };
        let difficulty = Difficulty::ALL[i];

        let kinds: Vec<String> = LessonKind::ALL.iter().map(|k| k.label().to_string()).collect();
        let Some(i) = self.choose("Lesson types", &kinds).await? else {
            return Ok(());
        };
        let kind = LessonKind::ALL[i];

        let mut topics: Vec<String> = self
            .lessons
            .topic_catalog()
            .iter()
            .map(|t| t.to_string())
            .collect();
        topics.push("Any topic".to_string());
        let Some(i) = self.choose("Lesson topics", &topics).await? else {
            return Ok(());
        };
        let topic = (i + 1 < topics.len()).then(|| topics[i].as_str());

        let mut context = LearningContext::new(&language.name, difficulty, kind);
        if let Some(lesson) = pick_lesson(&self.lessons, kind, difficulty, topic) {
            context = context.with_lesson(lesson);
        }

        let started = Tutor::start(
            self.model.clone(),
            self.store.clone(),
            context,
            self.config.history_turns,
        );
        let Some(mut tutor) = recover("start the lesson", started) else {
            return Ok(());
        };

        println!(
            "\n🎓 Starting {} level {} lesson for {}",
            difficulty.label(),
            kind,
            language.name
        );
        if let Some(lesson) = &tutor.context().lesson {
            println!("Lesson: {}", lesson.title);
            if !lesson.description.is_empty() {
                println!("Description: {}", lesson.description);
            }
        }

        match tutor.introduction().await {
            Ok(intro) => println!("\n🤖 Tutor: {intro}"),
            Err(e) => println!("\n⚠️ Could not generate an introduction: {e}"),
        }

        let scores = self.chat_loop(&mut tutor).await?;
        self.end_lesson(&mut tutor, &scores).await;
        Ok(())
    }

    /// Converse until the learner quits; returns the grammar scores seen
    async fn chat_loop(&mut self, tutor: &mut Tutor) -> Result<Vec<f64>> {
        println!("\n{RULE}");
        println!("💬 Conversation started! Type 'quit' to end the lesson.");
        if self.speech.is_some() {
            println!("   ':audio <file.wav>' sends a recording, ':speak <file>' saves the last reply as audio.");
        }
        println!("{RULE}");

        let mut scores = Vec::new();
        let mut last_reply: Option<String> = None;

        loop {
            let Some(line) = self.prompt("\n👤 You: ").await? else {
                break;
            };
            if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "bye") {
                break;
            }
            if line.is_empty() {
                continue;
            }

            let user_text = if let Some(path) = line.strip_prefix(":audio ") {
                match self.transcribe_file(path.trim()).await {
                    Some(text) => {
                        println!("🎤 Heard: {text}");
                        text
                    }
                    None => continue,
                }
            } else if let Some(path) = line.strip_prefix(":speak ") {
                self.speak_to_file(last_reply.as_deref(), path.trim()).await;
                continue;
            } else {
                line
            };

            println!("🤔 Thinking...");
            match tutor.respond_with_feedback(&user_text).await {
                Ok(TutorReply { response, feedback }) => {
                    println!("\n🤖 Tutor: {response}");
                    println!("\n📊 Feedback:");
                    if let Some(score) = feedback.grammar_score {
                        scores.push(score);
                        println!("   Grammar Score: {score}/10");
                    }
                    if !feedback.errors.is_empty() {
                        println!("   Areas to improve: {}", feedback.errors.join(", "));
                    }
                    if !feedback.strengths.is_empty() {
                        println!("   Strengths: {}", feedback.strengths.join(", "));
                    }
                    last_reply = Some(response);
                }
                Err(TutorError::EmptyInput) => continue,
                Err(e) => {
                    warn!("Reply failed: {}", e);
                    println!("\n⚠️ {e}\nPlease try again.");
                }
            }
        }
        Ok(scores)
    }

    async fn transcribe_file(&self, path: &str) -> Option<String> {
        let Some(engine) = &self.speech else {
            println!("🔇 Speech is not enabled.");
            return None;
        };
        let audio = match tokio::fs::read(path).await {
            Ok(audio) => audio,
            Err(e) => {
                println!("⚠️ Could not read {path}: {e}");
                return None;
            }
        };
        match engine.transcribe(&audio).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                println!("⚠️ No speech recognized.");
                None
            }
            Err(e) => {
                println!("⚠️ {e}");
                None
            }
        }
    }

    async fn speak_to_file(&self, reply: Option<&str>, path: &str) {
        let Some(engine) = &self.speech else {
            println!("🔇 Speech is not enabled.");
            return;
        };
        let Some(reply) = reply else {
            println!("⚠️ Nothing to speak yet.");
            return;
        };
        match engine.synthesize(reply).await {
            Ok(audio) => match tokio::fs::write(path, audio).await {
                Ok(()) => println!("🔊 Saved reply audio to {path}"),
                Err(e) => println!("⚠️ Could not write {path}: {e}"),
            },
            Err(e) => println!("⚠️ {e}"),
        }
    }

    async fn end_lesson(&self, tutor: &mut Tutor, scores: &[f64]) {
        let summary = match tutor.lesson_summary().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Lesson summary failed: {}", e);
                LessonSummary {
                    summary: "Great practice session!".to_string(),
                    achievements: Vec::new(),
                    areas_to_improve: Vec::new(),
                    next_steps: Vec::new(),
                }
            }
        };

        let score = (!scores.is_empty())
            .then(|| (scores.iter().sum::<f64>() / scores.len() as f64).round() as i64);
        recover("save the session", tutor.close(score));

        println!("\n{RULE}");
        println!("📋 LESSON SUMMARY");
        println!("{RULE}");
        println!("Summary: {}", summary.summary);
        print_list("\n✅ Achievements:", &summary.achievements);
        print_list("\n📈 Areas to improve:", &summary.areas_to_improve);
        print_list("\n🎯 Next steps:", &summary.next_steps);
        println!("\n{RULE}");
    }

    fn show_progress(&self) {
        let language = self.language.as_ref().map(|l| l.name.as_str());
        if let Some(report) = recover("load progress", progress_report(&self.store, language)) {
            print!("{report}");
        }
    }
}

/// Show a storage failure to the learner and carry on
fn recover<T>(action: &str, result: TutorResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not {}: {}", action, e);
            println!("\n⚠️ Could not {action}: {e}");
            None
        }
    }
}

/// Lesson for the chosen topic, else the first lesson of the kind
fn pick_lesson(
    lessons: &LessonManager,
    kind: LessonKind,
    difficulty: Difficulty,
    topic: Option<&str>,
) -> Option<Lesson> {
    if let Some(topic) = topic {
        match lessons.get_lesson(topic, difficulty) {
            Ok(lesson) => return Some(lesson.clone()),
            Err(e) => println!("ℹ️ {e}, using the default lesson"),
        }
    }
    lessons
        .lessons_for_kind(kind, difficulty)
        .first()
        .map(|lesson| (*lesson).clone())
}

fn progress_report(store: &ProgressStore, language: Option<&str>) -> TutorResult<String> {
    use std::fmt::Write as _;

    let progress = store.summary(language)?;
    let mut out = String::new();
    let _ = writeln!(out, "\n{RULE}");
    let _ = writeln!(out, "📊 YOUR PROGRESS");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Total Sessions: {}", progress.total_sessions);
    let _ = writeln!(out, "Total Time: {} minutes", progress.total_time_secs / 60);
    let _ = writeln!(out, "Average Score: {:.1}/10", progress.average_score);

    if !progress.groups.is_empty() {
        let _ = writeln!(out, "\nSession Details:");
        for group in &progress.groups {
            let _ = writeln!(
                out,
                "  {} - {} ({})",
                group.language, group.lesson_type, group.difficulty
            );
            let _ = writeln!(
                out,
                "    Sessions: {}, Avg Score: {:.1}",
                group.session_count, group.average_score
            );
        }
    }
    let _ = writeln!(out, "{RULE}");
    Ok(out)
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{title}");
    for item in items {
        println!("   • {item}");
    }
}
