use crate::domain::analysis::{
    AnalysisResult, CompetitivePositioning, EvasiveQuestion, ExecutiveAnalysis, FinancialMetrics,
    QaAnalysis,
};

/// Schema-conformant placeholder served whenever a live analysis cannot be
/// produced. Always paired with a `warning` on the wire.
pub fn mock_analysis() -> AnalysisResult {
    AnalysisResult {
        executive_analysis: Some(ExecutiveAnalysis {
            overall_tone: Some("positive".to_string()),
            confidence_level: Some("high".to_string()),
            hedging_language: Some(strings(&[
                "While macroeconomic uncertainties may persist into next quarter...",
                "Our expansion plans could be affected by regulatory changes...",
            ])),
            strong_claims: Some(strings(&[
                "We delivered record revenue of $2.7B, up 18% year-over-year",
                "Our customer acquisition cost decreased 12% while retention improved to 94%",
            ])),
            key_messages: Some(strings(&[
                "North American revenue grew 22% to $1.4B",
                "Cloud services division expanded margins by 320 basis points",
                "R&D investments increased 15% focusing on AI capabilities",
            ])),
        }),
        qa_analysis: Some(QaAnalysis {
            most_evasive_questions: Some(vec![EvasiveQuestion {
                question: "Can you break down the components of the 250 basis point margin pressure in the hardware division?".to_string(),
                analyst: Some("Jane Smith, Morgan Stanley".to_string()),
                directness: Some("somewhat evasive".to_string()),
                evasion_tactics: Some(strings(&[
                    "Redirected to overall company margins: 'Looking at the bigger picture, total company margins improved...'",
                    "Referenced temporary factors without specifics: 'Several one-time factors affected this segment'",
                ])),
            }]),
            notable_insights: Some(strings(&[
                "Planning $500M expansion in Southeast Asian markets beginning Q3",
                "New enterprise security product launching in August with 3 major clients already committed",
            ])),
        }),
        financial_metrics: Some(FinancialMetrics {
            highlighted_metrics: Some(strings(&[
                "18% YoY revenue growth",
                "94% customer retention rate",
                "32% gross margin in cloud services",
            ])),
            downplayed_metrics: Some(strings(&[
                "Hardware division revenue decline of 3%",
                "R&D as percentage of revenue increased from 14% to 16%",
            ])),
            new_metrics: Some(strings(&[
                "Introduced 'AI-enabled customer ratio' at 37%, expected to reach 50% by year-end",
            ])),
        }),
        competitive_positioning: Some(CompetitivePositioning {
            mentioned_competitors: Some(strings(&[
                "Referenced Competitor X's recent market exit: 'As others retreat from this space, we're doubling down'",
                "Compared cloud security features favorably to Competitor Y's offering",
            ])),
            market_dynamics: Some(strings(&[
                "Enterprise shift to hybrid cloud accelerating, with 65% of new customers choosing this option",
                "Supply chain constraints easing with component lead times down 30%",
            ])),
            competitive_advantages: Some(strings(&[
                "Proprietary AI platform generating 22% of recommendations, outperforming industry average of 15%",
                "Patent portfolio expanded by 47 new grants",
            ])),
        }),
        forward_looking_statements: Some(strings(&[
            "Projecting Q3 revenue between $2.8-2.9B, representing 15-20% YoY growth",
            "Expect to add 7-9 new enterprise clients in the financial services vertical",
        ])),
        red_flags: Some(strings(&[
            "Hardware margins compressed 250 basis points YoY, the third consecutive quarterly decline",
            "Customer acquisition costs in European market increased 18% with lower conversion rates",
        ])),
        change_analysis: Some(strings(&[
            "Stopped providing specific guidance on hardware division after three quarters of declining performance",
            "Shifted emphasis from geographic expansion to product development compared to previous calls",
        ])),
        overall_assessment: Some(
            "Strong overall performance led by cloud services and North American growth, though hardware division challenges persist and European expansion is proving more costly than anticipated. Management appears confident in AI strategy but less forthcoming about hardware roadmap."
                .to_string(),
        ),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
