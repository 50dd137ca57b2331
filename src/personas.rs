//! Inspection personas and system prompt composition
//!
//! This module defines the fixed set of analysis personas an inspection
//! session can run under, the global guardrail block appended to every
//! request, and the composition of the final system prompt.

use colored::Colorize;
use std::fmt;

/// Global guardrail block sent with every request
///
/// Enforces the assistant's identity and domain scope, including the exact
/// refusal template for out-of-domain images. Enforcement itself is the AI
/// service's responsibility; this text reaches the gateway unchanged.
pub const GUARDRAIL_PROMPT: &str = r#"
CRITICAL OPERATIONAL PROTOCOL:
1. IDENTITY: You are "Inspectra", a specialized industrial vision assistant.

2. DOMAIN ENFORCEMENT (HIGHEST PRIORITY):
   - You analyze ONLY: Industrial Machinery, Electronics, Tools, Blueprints, and Manufacturing parts.
   - If the image contains organic subjects (Food, Animals, People) or general consumer items (Furniture, Clothing, Scenery):
     * STOP ANALYSIS IMMEDIATELY.
     * DO NOT describe the object. DO NOT list materials. DO NOT explain its function.
     * Output ONLY this exact polite refusal:
       "⚠️ **Out of Scope:** Inspectra is calibrated for technical and industrial diagnostics. Please upload an image of a machine part, electronic component, or blueprint."

3. ANALYSIS RULES (For Valid Inputs Only):
   - Be concise, technical, and objective.
   - If the component is broken (cracked die, rusted pipe), identify the damage clearly.
   - Do not hallucinate specifications; estimate visual dimensions based on context.
"#;

const GENERAL_ANALYSIS_PROMPT: &str = r#"
Role: Senior Technical Engineer.
Goal: Comprehensive technical summary.

Output Structure:
1. ## Component Identification
   - Name, Function, Material.
2. ## Technical Specifications
   - Estimated Specs (Voltage, Dimensions, Interface).
3. ## Operational Context
   - Where is this used? How does it work?
"#;

const DEFECT_INSPECTION_PROMPT: &str = r#"
Role: QA Failure Analyst.
Goal: Forensic damage report.

CRITICAL INSTRUCTION: You MUST output the result in a Markdown Table.

Output Structure:
1. ## QA Status: [PASS / FAIL]
2. ## Defect Log
   | Zone | Anomaly Detected | Severity (Low/Med/Crit) | Rejection Criteria |
   | :--- | :--- | :--- | :--- |
   | [e.g. Die] | [e.g. Crack] | [Critical] | [ISO-9001 Fail] |
3. ## Remediation
   - Bullet points on exact repair/replace steps.
"#;

const SAFETY_AUDIT_PROMPT: &str = r#"
Role: HSE Safety Officer.
Goal: Risk Assessment.

CRITICAL INSTRUCTION: Focus ONLY on hazards.

Output Structure:
1. ## Hazard Matrix
   - 🔴 **High Risk:** [Immediate threats like exposed wires/blades]
   - 🟡 **Medium Risk:** [Potential threats like lack of labels]
   - 🟢 **Compliant:** [Safe aspects]
2. ## Required PPE
   - [List gloves, goggles, helmets, etc.]
"#;

/// Analysis persona for an inspection session
///
/// A persona selects the role and output format the assistant works under.
/// Exactly one persona is active per session, and it gates the system prompt
/// used for every submit in that session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    /// General technical summary of the component
    #[default]
    GeneralAnalysis,

    /// Forensic damage report in tabular form
    DefectInspection,

    /// Hazard-focused risk assessment
    SafetyAudit,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Persona {
    /// All personas, in menu order
    pub const ALL: [Persona; 3] = [
        Persona::GeneralAnalysis,
        Persona::DefectInspection,
        Persona::SafetyAudit,
    ];

    /// The display name, also used as the stored `mode` value
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneralAnalysis => "General Analysis",
            Self::DefectInspection => "Defect Inspection",
            Self::SafetyAudit => "Safety Audit",
        }
    }

    /// Parse a persona from its display name
    ///
    /// Matching is case-insensitive. Returns `None` for unknown names so
    /// callers can fall back to the default persona for values written by
    /// other versions of the application.
    ///
    /// # Examples
    ///
    /// ```
    /// use inspectra::personas::Persona;
    ///
    /// assert_eq!(Persona::from_name("Defect Inspection"), Some(Persona::DefectInspection));
    /// assert_eq!(Persona::from_name("unknown"), None);
    /// ```
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "general analysis" => Some(Self::GeneralAnalysis),
            "defect inspection" => Some(Self::DefectInspection),
            "safety audit" => Some(Self::SafetyAudit),
            _ => None,
        }
    }

    /// Get a user-friendly description of this persona
    pub fn description(&self) -> &'static str {
        match self {
            Self::GeneralAnalysis => "Comprehensive technical summary of the component",
            Self::DefectInspection => "Forensic damage report with a defect log table",
            Self::SafetyAudit => "Hazard matrix and required PPE",
        }
    }

    /// The base instruction text for this persona
    pub fn base_instruction(&self) -> &'static str {
        match self {
            Self::GeneralAnalysis => GENERAL_ANALYSIS_PROMPT,
            Self::DefectInspection => DEFECT_INSPECTION_PROMPT,
            Self::SafetyAudit => SAFETY_AUDIT_PROMPT,
        }
    }

    /// Get a colored tag representation of this persona
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use inspectra::personas::Persona;
    ///
    /// let tag = Persona::SafetyAudit.colored_tag();
    /// println!("{}", tag);  // Displays "[Safety Audit]" in yellow
    /// ```
    pub fn colored_tag(&self) -> String {
        match self {
            Self::GeneralAnalysis => format!("[{}]", self.name().cyan()),
            Self::DefectInspection => format!("[{}]", self.name().purple()),
            Self::SafetyAudit => format!("[{}]", self.name().yellow()),
        }
    }
}

/// Compose the final system prompt for a submit call
///
/// Concatenates, in fixed order: the persona's base instruction, the global
/// guardrail block, and, when present, free-text operator focus
/// instructions. The same order is used for every call in a session.
///
/// # Arguments
///
/// * `persona` - The session's active persona
/// * `focus` - Optional operator-supplied focus instructions
///
/// # Examples
///
/// ```
/// use inspectra::personas::{compose_system_prompt, Persona};
///
/// let prompt = compose_system_prompt(Persona::GeneralAnalysis, Some("Check for rust"));
/// assert!(prompt.contains("Check for rust"));
/// ```
pub fn compose_system_prompt(persona: Persona, focus: Option<&str>) -> String {
    let mut prompt = format!("{}\n\n{}", persona.base_instruction(), GUARDRAIL_PROMPT);
    if let Some(focus) = focus {
        let focus = focus.trim();
        if !focus.is_empty() {
            prompt.push_str("\n\nADDITIONAL OPERATOR INSTRUCTIONS:\n");
            prompt.push_str(focus);
        }
    }
    prompt
}
