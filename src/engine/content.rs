//! Templated stand-ins for model output: document skeletons, revised
//! content, ADRs and a canned demonstration debate.

use uuid::Uuid;

use crate::models::*;

/// One entry of the generated document skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureItem {
    pub title: String,
    pub doc_type: DocumentType,
    pub description: &'static str,
}

/// The fixed eight-document skeleton for `goal`: one blueprint, three
/// modules, three details and one implementation plan.
pub fn document_structure(goal: &str) -> Vec<StructureItem> {
    let item = |title: String, doc_type, description| StructureItem {
        title,
        doc_type,
        description,
    };
    vec![
        item(
            format!("{} - Project Blueprint", goal),
            DocumentType::Blueprint,
            "Project overview and vision",
        ),
        item(
            "System Architecture".into(),
            DocumentType::Module,
            "Technical architecture and system design",
        ),
        item(
            "User Interface Design".into(),
            DocumentType::Module,
            "UI/UX design and screen flow",
        ),
        item(
            "Core Feature Definition".into(),
            DocumentType::Module,
            "Detailed specification of the main features",
        ),
        item(
            "Data Model".into(),
            DocumentType::Detail,
            "Database schema and relations",
        ),
        item(
            "API Design".into(),
            DocumentType::Detail,
            "REST/GraphQL endpoint definitions",
        ),
        item(
            "Security Policy".into(),
            DocumentType::Detail,
            "Authentication, authorization and data protection",
        ),
        item(
            "Deployment Strategy".into(),
            DocumentType::Implementation,
            "CI/CD, infrastructure and monitoring",
        ),
    ]
}

/// Skeleton drafts with templated content. Only the first has no parent
/// marker; the caller links the rest under it.
pub fn structure_drafts(goal: &str) -> Vec<DocumentDraft> {
    document_structure(goal)
        .into_iter()
        .map(|item| DocumentDraft {
            parent_id: None,
            content: sample_content(&item.title, item.doc_type, goal),
            title: item.title,
            doc_type: item.doc_type,
            status: DocumentStatus::Draft,
            version: 1,
        })
        .collect()
}

/// Initial body for a document of the given type.
pub fn sample_content(title: &str, doc_type: DocumentType, goal: &str) -> String {
    match doc_type {
        DocumentType::Blueprint => format!(
            r#"# {title}

## 1. Project Overview

### 1.1 Vision
Deliver the best possible experience to users through {goal}.

### 1.2 Objectives
- Stable implementation of the core features
- An intuitive user interface
- A scalable architecture

## 2. Scope

### 2.1 In Scope
- User authentication and profile management
- Core business logic
- Administration dashboard

### 2.2 Out of Scope
- Advanced analytics (Phase 2)
- Localization (Phase 2)

## 3. Stakeholders
- End users
- System administrators
- Development team

## 4. Schedule (estimated)
- Phase 1: core features (8 weeks)
- Phase 2: extended features (6 weeks)
- Phase 3: optimization (4 weeks)

```mermaid
gantt
    title Project schedule
    dateFormat  YYYY-MM-DD
    section Phase 1
    Core features      :a1, 2024-01-01, 8w
    section Phase 2
    Extended features  :a2, after a1, 6w
    section Phase 3
    Optimization       :a3, after a2, 4w
```"#
        ),
        DocumentType::Module => format!(
            r#"# {title}

## Overview
This module is a core building block of the {goal} project.

## Key Features

### Feature 1
Details...

### Feature 2
Details...

## Technology Stack
- Frontend: React/Next.js
- Backend: Node.js/Python
- Database: PostgreSQL/MongoDB

## Architecture

```mermaid
flowchart TD
    A[Client] --> B[API Gateway]
    B --> C[Auth Service]
    B --> D[Business Logic]
    D --> E[Database]
```

## Dependencies
- User authentication module
- Shared utilities"#
        ),
        DocumentType::Detail => format!(
            r#"# {title}

## Detailed Specification

### Requirements
1. Functional requirement FR-001
2. Functional requirement FR-002
3. Non-functional requirement NFR-001

### Data Structure

```typescript
interface DataModel {{
  id: string;
  name: string;
  createdAt: Date;
  updatedAt: Date;
}}
```

### API Endpoints

| Method | Endpoint | Description |
|--------|----------|-------------|
| GET | /api/items | List |
| POST | /api/items | Create |
| PUT | /api/items/:id | Update |
| DELETE | /api/items/:id | Delete |

### Error Handling
- 400: Bad Request
- 401: Unauthorized
- 404: Not Found
- 500: Internal Server Error"#
        ),
        DocumentType::Implementation => format!(
            r#"# {title}

## Implementation Guide

### Environment Setup
```bash
npm install
npm run dev
```

### Development Guidelines
1. Follow the code conventions
2. Keep test coverage above 80%
3. Require PR review

### Deployment Process

```mermaid
flowchart LR
    A[Development] --> B[Test]
    B --> C[Staging]
    C --> D[Production]
```

### Monitoring
- Log collection: ELK Stack
- Metrics: Prometheus/Grafana
- Alerts: Slack/PagerDuty"#
        ),
    }
}

/// Revised plan for iteration `iteration`, listing every active rule and a
/// fixed architecture diagram.
pub fn revised_content(goal: &str, iteration: u32, rules: &[KnowledgeRule]) -> String {
    let mut content = format!("# {} - Detailed Plan (v{})\n\n", goal, iteration);

    content.push_str("## 1. Project Overview\n\n");
    content.push_str(&format!(
        "This document captures the detailed plan for the \"{}\" project.\n\n",
        goal
    ));

    content.push_str("## 2. Applied Knowledge Rules\n\n");
    let active: Vec<&KnowledgeRule> = rules.iter().filter(|r| r.is_active).collect();
    if active.is_empty() {
        content.push_str("- No rules learned yet.\n");
    } else {
        for rule in active {
            content.push_str(&format!("- **{}**: {}\n", rule.category, rule.rule));
        }
    }

    content.push_str("\n## 3. Core Features\n\n");
    content.push_str("### 3.1 User Authentication\n");
    content.push_str("Social login built on OAuth 2.0.\n\n");
    content.push_str("### 3.2 Core Business Logic\n");
    content.push_str(&format!("Implements the main features of {}.\n\n", goal));

    content.push_str("## 4. Technical Architecture\n\n");
    content.push_str(ARCHITECTURE_DIAGRAM);
    content.push('\n');

    content.push_str("## 5. Next Steps\n\n");
    content.push_str("- Phase 1: MVP development (4 weeks)\n");
    content.push_str("- Phase 2: Beta testing (2 weeks)\n");
    content.push_str("- Phase 3: General availability\n");

    content
}

const ARCHITECTURE_DIAGRAM: &str = "```mermaid
flowchart TD
    A[User] --> B[Web Client]
    B --> C[API Gateway]
    C --> D[Auth Service]
    C --> E[Core Service]
    D --> F[(User DB)]
    E --> G[(Main DB)]
```
";

/// Accepted ADR for an approved document.
pub fn generate_adr(document_title: &str, decision: &str, context: &str) -> Adr {
    Adr {
        id: Uuid::new_v4(),
        title: format!("ADR: {}", document_title),
        context: context.to_string(),
        decision: decision.to_string(),
        consequences: vec![
            "Consistent implementation along the chosen approach".into(),
            "Lower communication overhead within the team".into(),
            "Reference material for future maintenance".into(),
        ],
        alternatives: vec![
            "Use a different technology stack".into(),
            "Monolith versus microservice architecture".into(),
            "Adopt a third-party solution".into(),
        ],
        status: AdrStatus::Accepted,
    }
}

/// ADR with the standard decision and context wording for an approved document.
pub fn adr_for(title: &str, doc_type: DocumentType) -> Adr {
    generate_adr(
        title,
        &format!("Adopt the structure and features proposed in {}.", title),
        &format!(
            "Reaching the project goal required planning at the {} level.",
            doc_type.as_str()
        ),
    )
}

/// Scripted six-turn exchange for demonstrations: proposal, critique (72),
/// counter-proposal, Judge approval (83), Auditor approval and a learning
/// summary.
pub fn simulated_debate(goal: &str) -> Vec<NewDebateMessage> {
    vec![
        NewDebateMessage::new(
            AgentId::DecisionMaker,
            MessageKind::Proposal,
            format!(
                "Initial plan for \"{}\".\n\nCore features:\n1. User authentication (OAuth 2.0)\n\
                 2. Core business logic\n3. Administration dashboard\n\n\
                 Stack: Next.js + Node.js + PostgreSQL",
                goal
            ),
        ),
        NewDebateMessage::new(
            AgentId::Judge,
            MessageKind::Critique,
            "Reviewed the proposal.\n\nStrengths:\n- OAuth 2.0 is a sound choice\n\
             - The stack is realistic\n\nNeeds work:\n- The MVP scope is too broad\n\
             - Concrete user scenarios are missing",
        )
        .with_score(72)
        .with_highlights(vec![
            DebateHighlight::new(HighlightKind::Improvement, "OAuth 2.0 authentication"),
            DebateHighlight::new(HighlightKind::Issue, "MVP scope must shrink")
                .with_suggestion("Limit to three core features"),
            DebateHighlight::new(HighlightKind::Question, "Target users need definition"),
        ]),
        NewDebateMessage::new(
            AgentId::DecisionMaker,
            MessageKind::CounterProposal,
            "Revised proposal after feedback.\n\nMVP core features (Phase 1):\n\
             1. Social login (Google/Kakao)\n2. Main feature CRUD\n3. Basic notifications\n\n\
             Moved to Phase 2:\n- Advanced search\n- Analytics dashboard\n- Localization",
        ),
        NewDebateMessage::new(
            AgentId::Judge,
            MessageKind::Approval,
            "The revision is a clear improvement.\n\nScores:\n- Strategic fit: 85/100\n\
             - Feasibility: 88/100\n- Completeness: 78/100\n- Clarity: 82/100\n\n\
             Overall: 83 - approval recommended",
        )
        .with_score(83),
        NewDebateMessage::new(
            AgentId::Auditor,
            MessageKind::Approval,
            "Approving the reviewed plan.\n\nExtracted rules:\n\
             1. Limit the MVP to three core features or fewer\n\
             2. Support Google and Kakao social login first\n\
             3. Separate later features into explicit phases on the roadmap",
        ),
        NewDebateMessage::new(
            AgentId::Auditor,
            MessageKind::Learning,
            "Rules learned this session:\n- Keep the MVP to three core features or fewer\n\
             - Kakao login is mandatory when targeting the Korean market\n\
             - Manage scope with clearly separated phases",
        ),
    ]
}
