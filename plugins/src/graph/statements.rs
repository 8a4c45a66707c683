//! Cypher statements for the agreement graph.

/// Merges one extracted agreement record, passed as `$data`, into the graph.
pub const CREATE_GRAPH: &str = r#"
WITH $data AS data
WITH data.agreement AS a

MERGE (agreement:Agreement {contract_id: a.contract_id})
ON CREATE SET
  agreement.name = a.agreement_name,
  agreement.effective_date = a.effective_date,
  agreement.expiration_date = a.expiration_date,
  agreement.agreement_type = a.agreement_type,
  agreement.renewal_term = a.renewal_term,
  agreement.most_favored_country = a.governing_law.most_favored_country

MERGE (gl_country:Country {name: a.governing_law.country})
MERGE (agreement)-[gbl:GOVERNED_BY_LAW]->(gl_country)
SET gbl.state = a.governing_law.state

WITH a, agreement
FOREACH (party IN a.parties |
  MERGE (p:Organization {name: party.name})
  MERGE (p)-[ipt:IS_PARTY_TO]->(agreement)
  SET ipt.role = party.role
  MERGE (country_of_incorporation:Country {name: party.incorporation_country})
  MERGE (p)-[incorporated:INCORPORATED_IN]->(country_of_incorporation)
  SET incorporated.state = party.incorporation_state
)

WITH a, agreement, [clause IN a.clauses WHERE clause.exists = true] AS valid_clauses
FOREACH (clause IN valid_clauses |
  CREATE (cl:ContractClause {type: clause.clause_type})
  MERGE (agreement)-[clt:HAS_CLAUSE]->(cl)
  SET clt.type = clause.clause_type
  FOREACH (excerpt IN clause.excerpts |
    MERGE (cl)-[:HAS_EXCERPT]->(e:Excerpt {text: excerpt})
  )
  MERGE (clType:ClauseType {name: clause.clause_type})
  MERGE (cl)-[:HAS_TYPE]->(clType)
)

WITH a, agreement
FOREACH (risk IN coalesce(a.risks, []) |
  CREATE (r:Risk {
    risk_type: risk.risk_type,
    description: risk.description,
    level: risk.level,
    impact: risk.impact
  })
  MERGE (agreement)-[:HAS_RISK]->(r)
)

WITH a, agreement
FOREACH (obligation IN coalesce(a.obligations, []) |
  CREATE (o:Obligation {
    description: obligation.description,
    due_date: obligation.due_date,
    recurring: obligation.recurring,
    recurrence_pattern: obligation.recurrence_pattern,
    status: obligation.status,
    reminder_days: obligation.reminder_days
  })
  MERGE (agreement)-[:HAS_OBLIGATION]->(o)
)
"#;

/// Full-text and range indices, created one by one.
pub const INDICES: &[(&str, &str)] = &[
    (
        "excerptTextIndex",
        "CREATE FULLTEXT INDEX excerptTextIndex IF NOT EXISTS FOR (e:Excerpt) ON EACH [e.text]",
    ),
    (
        "agreementTypeTextIndex",
        "CREATE FULLTEXT INDEX agreementTypeTextIndex IF NOT EXISTS FOR (a:Agreement) ON EACH [a.agreement_type]",
    ),
    (
        "clauseTypeNameTextIndex",
        "CREATE FULLTEXT INDEX clauseTypeNameTextIndex IF NOT EXISTS FOR (ct:ClauseType) ON EACH [ct.name]",
    ),
    (
        "contractClauseTypeTextIndex",
        "CREATE FULLTEXT INDEX contractClauseTypeTextIndex IF NOT EXISTS FOR (c:ContractClause) ON EACH [c.type]",
    ),
    (
        "organizationNameTextIndex",
        "CREATE FULLTEXT INDEX organizationNameTextIndex IF NOT EXISTS FOR (o:Organization) ON EACH [o.name]",
    ),
    (
        "agreementContractId",
        "CREATE INDEX agreementContractId IF NOT EXISTS FOR (a:Agreement) ON (a.contract_id)",
    ),
    (
        "riskTypeIndex",
        "CREATE INDEX riskTypeIndex IF NOT EXISTS FOR (r:Risk) ON (r.risk_type)",
    ),
    (
        "riskLevelIndex",
        "CREATE INDEX riskLevelIndex IF NOT EXISTS FOR (r:Risk) ON (r.level)",
    ),
    (
        "obligationStatusIndex",
        "CREATE INDEX obligationStatusIndex IF NOT EXISTS FOR (o:Obligation) ON (o.status)",
    ),
    (
        "obligationDueDateIndex",
        "CREATE INDEX obligationDueDateIndex IF NOT EXISTS FOR (o:Obligation) ON (o.due_date)",
    ),
];

pub const EMBEDDING_DIMENSIONS: u32 = 1536;

pub const CREATE_VECTOR_INDEX: &str = "CREATE VECTOR INDEX excerpt_embedding IF NOT EXISTS \
FOR (e:Excerpt) ON (e.embedding) \
OPTIONS {indexConfig: {`vector.dimensions`: 1536, `vector.similarity_function`: 'cosine'}}";

/// Encodes every excerpt that has text but no embedding yet.
pub const COMPUTE_EMBEDDINGS: &str = r#"
MATCH (e:Excerpt)
WHERE e.text IS NOT NULL AND e.embedding IS NULL
SET e.embedding = genai.vector.encode(e.text, "OpenAI", {
  token: $token, model: $model, dimensions: $dimensions
})
"#;
