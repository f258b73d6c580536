use anyhow::{anyhow, Result};
use console::style;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::sync::Arc;

use persona::models::message::Message;
use persona::providers::base::Provider;
use persona::providers::configs::{self, OpenAiProviderConfig};
use persona::providers::openai::OpenAiProvider;

const QUESTION_REQUEST: &str = "Please come up with a challenging, nuanced question that tests \
reasoning ability. Answer only with the question, no explanation.";

#[derive(Debug, Deserialize)]
struct Ranking {
    /// Competitor numbers, best first
    results: Vec<i64>,
}

struct Contender {
    model: String,
    provider: Arc<OpenAiProvider>,
}

/// The providers configured in the environment: the primary one plus, when
/// GOOGLE_API_KEY is set, Gemini through its OpenAI-compatible endpoint.
fn contenders() -> Result<Vec<Contender>> {
    let mut contenders = Vec::new();

    let primary_config = OpenAiProviderConfig::from_env()?;
    contenders.push(Contender {
        model: primary_config.model.clone(),
        provider: Arc::new(OpenAiProvider::new(primary_config)?),
    });

    if let Ok(api_key) = env::var("GOOGLE_API_KEY") {
        let host = env::var("GEMINI_HOST").unwrap_or_else(|_| configs::GEMINI_HOST.to_string());
        let model = env::var("PERSONA_JUDGE_MODEL")
            .unwrap_or_else(|_| configs::GEMINI_DEFAULT_MODEL.to_string());
        let config = OpenAiProviderConfig::new(host, api_key, model.clone())
            .with_completions_path(configs::GEMINI_COMPLETIONS_PATH);
        contenders.push(Contender {
            model,
            provider: Arc::new(OpenAiProvider::new(config)?),
        });
    }

    Ok(contenders)
}

/// Pose one question to every configured provider concurrently, print the
/// answers, then have the primary provider rank them.
pub async fn run(prompt: Option<String>) -> Result<()> {
    let contenders = contenders()?;
    let judge = contenders[0].provider.clone();

    let question = match prompt {
        Some(question) => question,
        None => {
            let messages = vec![Message::user().with_text(QUESTION_REQUEST)];
            let (response, _) = judge.complete("", &messages, &[]).await?;
            response.text()
        }
    };

    println!("{}", style("Question:").bold());
    println!("{}\n", question);

    // Independent, unrelated queries: run them concurrently and only merge
    // once all have completed
    let messages = vec![Message::user().with_text(&question)];
    let queries = contenders.iter().map(|contender| {
        let provider = contender.provider.clone();
        let messages = messages.clone();
        async move { provider.complete("", &messages, &[]).await }
    });
    let responses = join_all(queries).await;

    let mut answers = Vec::new();
    for (contender, response) in contenders.iter().zip(responses) {
        println!("{}", style(format!("Competitor: {}", contender.model)).bold());
        match response {
            Ok((message, _)) => {
                let answer = message.text();
                println!("{}\n", answer);
                answers.push((contender.model.clone(), answer));
            }
            Err(e) => {
                println!("{}\n", style(format!("failed: {}", e)).red());
            }
        }
    }

    if answers.len() < 2 {
        return Err(anyhow!(
            "Need at least two answers to rank; configure GOOGLE_API_KEY for a second provider"
        ));
    }

    let mut together = String::new();
    for (index, (_, answer)) in answers.iter().enumerate() {
        together.push_str(&format!("# Response from competitor {}\n\n", index + 1));
        together.push_str(answer);
        together.push_str("\n\n");
    }

    let judge_prompt = format!(
        "You are judging a competition between {count} competitors.\n\
Each model has been given this question:\n\n{question}\n\n\
Your job is to evaluate each response for clarity and strength of argument, \
and rank them in order of best to worst.\n\n\
Here are the responses from each competitor:\n\n{together}",
        count = answers.len(),
    );

    let schema = json!({
        "type": "object",
        "properties": {
            "results": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "Competitor numbers ranked from best to worst"
            }
        },
        "required": ["results"],
        "additionalProperties": false
    });

    let judge_messages = vec![Message::user().with_text(judge_prompt)];
    let (verdict, _) = judge
        .complete_structured("", &judge_messages, "ranking", &schema)
        .await?;
    let ranking: Ranking = serde_json::from_value(verdict)
        .map_err(|e| anyhow!("Judge ranking did not parse: {}", e))?;

    println!("{}", style("Rankings (best to worst):").bold());
    for (rank, competitor_number) in ranking.results.iter().enumerate() {
        let index = (competitor_number - 1) as usize;
        match answers.get(index) {
            Some((model, _)) => println!("Rank {}: {}", rank + 1, model),
            None => println!("Rank {}: unknown competitor {}", rank + 1, competitor_number),
        }
    }

    Ok(())
}
